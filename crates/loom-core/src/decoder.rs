//! Frame decoder for the streamed chat protocol.
//!
//! The endpoint streams newline-delimited records. Records of interest look like
//! `data: {"text":"..."}`; everything else is framing and is skipped. Chunks arrive
//! at arbitrary byte boundaries, so the decoder keeps the unterminated tail between
//! pushes. Splitting happens on raw bytes: `\n` never occurs inside a multi-byte
//! UTF-8 sequence, so a character split across two chunks is reassembled before
//! its record is parsed.

use crate::error::{AssistError, AssistResult};
use async_stream::stream;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use tracing::debug;

/// Prefix that marks a record carrying an event payload.
pub const EVENT_PREFIX: &[u8] = b"data: ";

/// Terminal sentinel some upstreams send; skipped without counting as malformed.
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// One decoded protocol event: an incremental text fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub text: String,
}

#[derive(Deserialize)]
struct FramePayload {
    #[serde(default)]
    text: Option<String>,
}

enum Record {
    Event(FrameEvent),
    Ignored,
    Malformed,
}

fn parse_record(line: &[u8]) -> Record {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(payload) = line.strip_prefix(EVENT_PREFIX) else {
        return Record::Ignored;
    };
    if payload == DONE_SENTINEL {
        return Record::Ignored;
    }
    match serde_json::from_slice::<FramePayload>(payload) {
        Ok(FramePayload { text: Some(text) }) if !text.is_empty() => {
            Record::Event(FrameEvent { text })
        }
        Ok(_) => Record::Ignored,
        Err(_) => Record::Malformed,
    }
}

/// Incremental, single-use decoder. Create one per request.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event completed by it, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            match parse_record(&self.buffer[start..end]) {
                Record::Event(event) => events.push(event),
                Record::Ignored => {}
                Record::Malformed => self.note_malformed(end - start),
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        events
    }

    /// End of stream. A trailing record without its newline is still decoded,
    /// since stream closure terminates it.
    pub fn finish(mut self) -> Vec<FrameEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let tail = std::mem::take(&mut self.buffer);
        match parse_record(&tail) {
            Record::Event(event) => vec![event],
            Record::Ignored => Vec::new(),
            Record::Malformed => {
                self.note_malformed(tail.len());
                Vec::new()
            }
        }
    }

    /// Records dropped because their payload failed to parse.
    pub fn malformed_records(&self) -> usize {
        self.malformed
    }

    /// Bytes held back waiting for a record separator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn note_malformed(&mut self, len: usize) {
        self.malformed += 1;
        debug!(record_len = len, total = self.malformed, "dropping malformed stream record");
    }
}

/// Decode a chunked byte stream into events.
///
/// An upstream error yields a single `Err(AssistError::Transport)` and ends the
/// sequence. Parse failures never reach the caller.
pub fn decode_stream<S, B, E>(chunks: S) -> impl Stream<Item = AssistResult<FrameEvent>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    stream! {
        let mut decoder = FrameDecoder::new();
        let mut failed = false;
        futures_util::pin_mut!(chunks);
        while let Some(item) = chunks.next().await {
            match item {
                Ok(bytes) => {
                    for event in decoder.push(bytes.as_ref()) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(AssistError::Transport(e.to_string()));
                    break;
                }
            }
        }
        if !failed {
            for event in decoder.finish() {
                yield Ok(event);
            }
        }
    }
}
