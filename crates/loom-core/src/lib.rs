//! loom-core: engines behind the Loom assistant panel and loop map.
//!
//! ```text
//! request ─▶ ChatTransport ─▶ FrameDecoder ─▶ SessionEngine ─▶ SessionSnapshot ─▶ renderer
//!               ▲                                  ▲
//!        CredentialStore                     TriggerGuard (auto-explain)
//!
//! anchor + viewport ─▶ place()          entities ─▶ RadialLayout   gestures ─▶ ViewTransform
//! ```
//!
//! The session engine, placement and layout are pure; only the transport and the
//! credential monitor touch the outside world.

pub mod client;
pub mod config;
pub mod context;
pub mod credential;
pub mod decoder;
pub mod error;
pub mod layout;
pub mod message;
pub mod placement;
pub mod session;
pub mod transport;
pub mod trigger;
pub mod view;

pub use client::AssistClient;
pub use config::AssistConfig;
pub use context::{ComponentContext, Fingerprint, AUTO_EXPLAIN_PROMPT};
pub use credential::{
    ChainedCredentialStore, CredentialMonitor, CredentialStore, EnvCredentialStore,
    FileCredentialStore, MemoryCredentialStore, DEFAULT_CREDENTIAL_KEY,
};
pub use decoder::{decode_stream, FrameDecoder, FrameEvent, EVENT_PREFIX};
pub use error::{AssistError, AssistResult};
pub use layout::{LayoutEntity, LoopMode, Orbit, PlacedEntity, Point, RadialLayout, SizeScale};
pub use message::{Message, Role};
pub use placement::{
    place, HorizontalSide, Placement, PlacementGeometry, PlacementTracker, PlacementTrigger, Rect,
    Size, VerticalSide,
};
pub use session::{
    ChatRequest, Phase, RequestId, RequestKind, SessionEngine, SessionSnapshot,
    AUTO_EXPLAIN_FALLBACK, SEND_FALLBACK,
};
pub use transport::{ByteStream, ChatTransport, HttpTransport};
pub use trigger::TriggerGuard;
pub use view::{
    is_interactive_target, ElementTree, GestureController, GestureOutcome, ViewTransform, MAX_ZOOM,
    MIN_ZOOM,
};
