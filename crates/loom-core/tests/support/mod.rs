//! Scripted in-memory transport for driving the client without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use loom_core::{AssistError, AssistResult, ByteStream, ChatRequest, ChatTransport};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

pub enum Script {
    /// Fail to open with this status.
    Status(u16),
    /// Deliver these chunks, then close. `Err` items break the stream.
    Chunks(Vec<Result<Vec<u8>, String>>),
    /// Deliver whatever the test pushes into the channel; closes when the sender drops.
    Channel(mpsc::UnboundedReceiver<Result<Vec<u8>, String>>),
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    opened: Mutex<Vec<(String, ChatRequest)>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Every `(credential, request)` the transport was asked to open.
    pub fn opened(&self) -> Vec<(String, ChatRequest)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, credential: &str, request: &ChatRequest) -> AssistResult<ByteStream> {
        self.opened
            .lock()
            .unwrap()
            .push((credential.to_string(), request.clone()));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script left for request");
        match script {
            Script::Status(code) => Err(AssistError::TransportStatus(code)),
            Script::Chunks(chunks) => Ok(futures_util::stream::iter(
                chunks.into_iter().map(|c| c.map_err(AssistError::Transport)),
            )
            .boxed()),
            Script::Channel(rx) => Ok(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv()
                    .await
                    .map(|c| (c.map_err(AssistError::Transport), rx))
            })
            .boxed()),
        }
    }
}

pub fn record(text: &str) -> Vec<u8> {
    format!("data: {}\n", serde_json::json!({ "text": text })).into_bytes()
}
