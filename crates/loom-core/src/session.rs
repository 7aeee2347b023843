//! Session engine: one conversation's lifecycle.
//!
//! The engine is a pure state machine. It never touches the network; it hands out
//! [`ChatRequest`]s and folds decoder events back in. Every request carries a fresh
//! [`RequestId`] and only the active request may mutate state, so a superseded
//! stream that keeps delivering data is inert.

use crate::context::{ComponentContext, AUTO_EXPLAIN_PROMPT};
use crate::decoder::FrameEvent;
use crate::message::Message;
use crate::trigger::TriggerGuard;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shown when a user turn fails.
pub const SEND_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";

/// Shown when an automatic explanation fails.
pub const AUTO_EXPLAIN_FALLBACK: &str = "I can help explain this component. What would you like to know?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Streaming,
    Error,
}

impl Phase {
    /// Phases in which a new user turn may start.
    pub fn accepts_send(self) -> bool {
        matches!(self, Phase::Idle | Phase::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Streaming => "streaming",
            Phase::Error => "error",
        }
    }
}

/// Opaque per-request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    UserMessage,
    AutoExplain,
}

impl RequestKind {
    pub fn fallback(self) -> &'static str {
        match self {
            RequestKind::UserMessage => SEND_FALLBACK,
            RequestKind::AutoExplain => AUTO_EXPLAIN_FALLBACK,
        }
    }
}

/// Outbound request: full history plus the system preamble.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub messages: Vec<Message>,
    pub system_prompt: String,
}

/// Immutable view handed to renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub phase: Phase,
    pub request_id: Option<RequestId>,
    pub open: bool,
    pub has_credential: bool,
}

impl SessionSnapshot {
    /// Waiting for the first fragment of the active request.
    pub fn awaiting_first_fragment(&self) -> bool {
        self.phase == Phase::Loading
    }
}

#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    kind: RequestKind,
    /// Index of the assistant message this request streams into, once opened.
    assistant_index: Option<usize>,
}

#[derive(Debug)]
pub struct SessionEngine {
    context: ComponentContext,
    messages: Vec<Message>,
    phase: Phase,
    request_id: Option<RequestId>,
    active: Option<ActiveRequest>,
    guard: TriggerGuard,
    open: bool,
    has_credential: bool,
}

impl SessionEngine {
    pub fn new(context: ComponentContext) -> Self {
        Self {
            context,
            messages: Vec::new(),
            phase: Phase::Idle,
            request_id: None,
            active: None,
            guard: TriggerGuard::new(),
            open: false,
            has_credential: false,
        }
    }

    /// Open the panel: empty conversation, fresh trigger guard, phase Idle.
    pub fn open(&mut self) {
        self.reset_conversation();
        self.open = true;
        info!(component = %self.context.component_name, "assistant session opened");
    }

    /// Close the panel. Any in-flight stream becomes inert.
    pub fn close(&mut self) {
        self.reset_conversation();
        self.open = false;
        info!(component = %self.context.component_name, "assistant session closed");
    }

    fn reset_conversation(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(request_id = %active.id, "dropping in-flight request");
        }
        self.messages.clear();
        self.phase = Phase::Idle;
        self.request_id = None;
        self.guard.reset();
    }

    pub fn set_credential_present(&mut self, present: bool) {
        if self.has_credential != present {
            debug!(present, "credential presence changed");
        }
        self.has_credential = present;
    }

    /// Start a user turn. Returns `None` (and leaves state untouched) when the text
    /// is blank, the panel is closed, no credential is present, or a request is
    /// already in flight.
    pub fn send_user_message(&mut self, text: &str) -> Option<ChatRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if !self.open || !self.has_credential {
            debug!(open = self.open, has_credential = self.has_credential, "send ignored");
            return None;
        }
        if !self.phase.accepts_send() {
            debug!(phase = self.phase.as_str(), "send ignored while request in flight");
            return None;
        }

        self.messages.push(Message::user(text));
        let history = self.messages.clone();
        Some(self.begin(RequestKind::UserMessage, history))
    }

    /// Replace the observed context and run the trigger guard against it.
    pub fn observe_context(&mut self, context: ComponentContext) -> Option<ChatRequest> {
        self.context = context;
        self.auto_explain()
    }

    /// Issue an automatic explanation if the trigger guard allows it. Supersedes
    /// whatever request is in flight and resets the visible conversation.
    pub fn auto_explain(&mut self) -> Option<ChatRequest> {
        let fingerprint = self.context.fingerprint();
        if !self.guard.evaluate(self.open, self.has_credential, &fingerprint) {
            return None;
        }
        if let Some(previous) = self.active.take() {
            info!(request_id = %previous.id, "request superseded by auto-explain");
        }
        self.messages.clear();
        Some(self.begin(RequestKind::AutoExplain, vec![Message::user(AUTO_EXPLAIN_PROMPT)]))
    }

    fn begin(&mut self, kind: RequestKind, messages: Vec<Message>) -> ChatRequest {
        let id = RequestId::new();
        self.request_id = Some(id);
        self.active = Some(ActiveRequest {
            id,
            kind,
            assistant_index: None,
        });
        self.phase = Phase::Loading;
        info!(request_id = %id, ?kind, history = messages.len(), "request issued");
        ChatRequest {
            id,
            kind,
            messages,
            system_prompt: self.context.system_preamble(),
        }
    }

    /// Fold one decoded fragment. Returns `false` when the event was stale.
    pub fn on_decoder_event(&mut self, id: RequestId, event: &FrameEvent) -> bool {
        let active = match self.active.as_mut() {
            Some(active) if active.id == id => active,
            _ => {
                debug!(request_id = %id, "discarding stale fragment");
                return false;
            }
        };
        if event.text.is_empty() {
            return true;
        }
        let index = match active.assistant_index {
            Some(index) => index,
            None => {
                self.messages.push(Message::assistant(String::new()));
                let index = self.messages.len() - 1;
                active.assistant_index = Some(index);
                self.phase = Phase::Streaming;
                index
            }
        };
        self.messages[index].content.push_str(&event.text);
        true
    }

    /// The active stream completed normally.
    pub fn on_stream_end(&mut self, id: RequestId) -> bool {
        let Some(active) = self.take_active(id) else {
            return false;
        };
        self.phase = Phase::Idle;
        let chars = active
            .assistant_index
            .map(|i| self.messages[i].content.chars().count())
            .unwrap_or(0);
        info!(request_id = %id, chars, "stream completed");
        true
    }

    /// The active stream failed to open or broke mid-flight.
    pub fn on_stream_error(&mut self, id: RequestId, reason: &str) -> bool {
        let Some(active) = self.take_active(id) else {
            return false;
        };
        warn!(request_id = %id, reason, "stream failed");
        self.phase = Phase::Error;
        // With zero content no assistant message was opened, so the fallback is the
        // only assistant reply. Partial content stays and the fallback follows it.
        self.messages.push(Message::assistant(active.kind.fallback()));
        true
    }

    fn take_active(&mut self, id: RequestId) -> Option<ActiveRequest> {
        if self.active.as_ref().is_some_and(|active| active.id == id) {
            return self.active.take();
        }
        debug!(request_id = %id, "discarding stale completion");
        None
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_credential(&self) -> bool {
        self.has_credential
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn context(&self) -> &ComponentContext {
        &self.context
    }

    pub fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            phase: self.phase,
            request_id: self.request_id,
            open: self.open,
            has_credential: self.has_credential,
        }
    }
}
