//! Client driver: wires the session engine to a transport and a credential store.
//!
//! Requests run to completion on the caller's task; events are folded strictly in
//! arrival order. After every state change a [`SessionSnapshot`] is published on a
//! `watch` channel for renderers. When a request is superseded its stream is
//! dropped at the next event it delivers.

use crate::context::ComponentContext;
use crate::credential::{resolve, CredentialStore};
use crate::decoder::decode_stream;
use crate::error::AssistError;
use crate::session::{ChatRequest, SessionEngine, SessionSnapshot};
use crate::transport::ChatTransport;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct AssistClient {
    session: Arc<Mutex<SessionEngine>>,
    transport: Arc<dyn ChatTransport>,
    credentials: Arc<dyn CredentialStore>,
    credential_key: String,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
}

impl AssistClient {
    pub fn new(
        context: ComponentContext,
        transport: Arc<dyn ChatTransport>,
        credentials: Arc<dyn CredentialStore>,
        credential_key: impl Into<String>,
    ) -> Self {
        let engine = SessionEngine::new(context);
        let (snapshots, _) = watch::channel(engine.snapshot());
        Self {
            session: Arc::new(Mutex::new(engine)),
            transport,
            credentials,
            credential_key: credential_key.into(),
            snapshots: Arc::new(snapshots),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    fn credential(&self) -> Option<String> {
        resolve(self.credentials.as_ref(), &self.credential_key)
    }

    /// Run `f` against the engine and publish a snapshot if anything changed.
    async fn update<R>(&self, f: impl FnOnce(&mut SessionEngine) -> R) -> R {
        let mut engine = self.session.lock().await;
        let result = f(&mut engine);
        let snapshot = engine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        result
    }

    /// Open the panel. Returns the auto-explain request when the guard fires.
    pub async fn open(&self) -> Option<ChatRequest> {
        let present = self.credential().is_some();
        self.update(|engine| {
            engine.set_credential_present(present);
            engine.open();
            engine.auto_explain()
        })
        .await
    }

    pub async fn close(&self) {
        self.update(|engine| engine.close()).await;
    }

    /// Credential presence changed (from a [`crate::CredentialMonitor`]).
    pub async fn credential_changed(&self, present: bool) -> Option<ChatRequest> {
        self.update(|engine| {
            engine.set_credential_present(present);
            engine.auto_explain()
        })
        .await
    }

    /// The observed component changed or re-rendered.
    pub async fn observe_context(&self, context: ComponentContext) -> Option<ChatRequest> {
        let present = self.credential().is_some();
        self.update(|engine| {
            engine.set_credential_present(present);
            engine.observe_context(context)
        })
        .await
    }

    /// Start a user turn without running it.
    pub async fn start_user_message(&self, text: &str) -> Option<ChatRequest> {
        let present = self.credential().is_some();
        self.update(|engine| {
            engine.set_credential_present(present);
            engine.send_user_message(text)
        })
        .await
    }

    /// Start and run a user turn. Returns false when the send was rejected.
    pub async fn send(&self, text: &str) -> bool {
        match self.start_user_message(text).await {
            Some(request) => {
                self.run(request).await;
                true
            }
            None => false,
        }
    }

    /// Drive one request through transport, decoder and engine.
    pub async fn run(&self, request: ChatRequest) {
        let id = request.id;
        let Some(credential) = self.credential() else {
            let reason = AssistError::MissingCredential.to_string();
            self.update(|engine| engine.on_stream_error(id, &reason)).await;
            return;
        };

        let body = match self.transport.open(&credential, &request).await {
            Ok(body) => body,
            Err(e) => {
                let reason = e.to_string();
                self.update(|engine| engine.on_stream_error(id, &reason)).await;
                return;
            }
        };

        let events = decode_stream(body);
        futures_util::pin_mut!(events);
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let applied = self.update(|engine| engine.on_decoder_event(id, &event)).await;
                    if !applied {
                        debug!(request_id = %id, "request superseded; dropping stream");
                        return;
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.update(|engine| engine.on_stream_error(id, &reason)).await;
                    return;
                }
            }
        }
        if self.update(|engine| engine.on_stream_end(id)).await {
            info!(request_id = %id, "request finished");
        }
    }
}
