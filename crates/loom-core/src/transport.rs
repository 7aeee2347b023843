//! Outbound transport: opens one streamed chat request.

use crate::error::{AssistError, AssistResult};
use crate::message::Message;
use crate::session::ChatRequest;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Raw response body as it arrives off the wire.
pub type ByteStream = BoxStream<'static, AssistResult<Vec<u8>>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open the request. A non-success status is an error here; once a stream is
    /// returned, failures surface as items on it.
    async fn open(&self, credential: &str, request: &ChatRequest) -> AssistResult<ByteStream>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    api_key: &'a str,
    messages: &'a [Message],
    system_prompt: &'a str,
}

/// HTTP POST to the chat endpoint with a streamed body.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AssistResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, credential: &str, request: &ChatRequest) -> AssistResult<ByteStream> {
        let body = ChatBody {
            api_key: credential,
            messages: &request.messages,
            system_prompt: &request.system_prompt,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistError::Transport(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(AssistError::TransportStatus(status.as_u16()));
        }
        debug!(request_id = %request.id, status = status.as_u16(), "stream opened");

        Ok(res
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(AssistError::from))
            .boxed())
    }
}
