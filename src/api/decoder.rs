// Incremental decoder for `data: ` framed event streams

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use super::ApiError;

pub const DATA_PREFIX: &str = "data: ";

/// Longest line the decoder will hold. Longer lines are dropped whole, so a
/// server that never sends `\n` cannot grow the buffer without bound.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A decoded event from the answer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental piece of the assistant's answer
    Token(String),
    /// The server gave up on the answer. Nothing follows this event.
    Error(String),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ApiError>> + Send>>;

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Line-buffering decoder fed with raw body chunks.
///
/// Chunks may split a line (or a multi-byte character) anywhere. Bytes are
/// held until a `\n` arrives, so the emitted events depend only on the
/// concatenated input and never on where the chunk boundaries fall.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    closed: bool,
    // Skipping the rest of an oversized line until its `\n` shows up
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the decoder has stopped producing events, either after a
    /// terminal error record or after [`SseDecoder::close`].
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feed one chunk and return the events completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = &self.buffer[start..end];
            start = end + 1;

            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if line.len() > MAX_LINE_BYTES {
                tracing::warn!(bytes = line.len(), "dropping oversized event line");
                continue;
            }
            let event = parse_line(line);

            match event {
                Some(StreamEvent::Error(message)) => {
                    events.push(StreamEvent::Error(message));
                    self.close();
                    return events;
                }
                Some(token) => events.push(token),
                None => {}
            }
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_LINE_BYTES {
            if !self.discarding {
                tracing::warn!(
                    bytes = self.buffer.len(),
                    "event line exceeds limit, discarding until next newline"
                );
            }
            self.buffer.clear();
            self.discarding = true;
        }

        events
    }

    /// Stop decoding. Any unterminated trailing line is dropped.
    pub fn close(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "discarding unterminated line"
            );
        }
        self.buffer.clear();
        self.closed = true;
    }
}

fn parse_line(raw: &[u8]) -> Option<StreamEvent> {
    let text = String::from_utf8_lossy(raw);
    let line = text.strip_suffix('\r').unwrap_or(&text);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str::<EventRecord>(payload) {
        Ok(EventRecord {
            error: Some(message),
            ..
        }) => Some(StreamEvent::Error(message)),
        Ok(EventRecord {
            token: Some(token), ..
        }) if !token.is_empty() => Some(StreamEvent::Token(token)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, payload, "dropping malformed event line");
            None
        }
    }
}

/// Decode a response body into a stream of [`StreamEvent`]s.
///
/// A read error from the body is yielded once as [`ApiError::Stream`] and
/// ends the stream, as does an error record.
pub fn decode_stream<S, E>(byte_stream: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send,
{
    let stream = futures::stream::unfold(
        (Box::pin(byte_stream), SseDecoder::new(), VecDeque::new()),
        |(mut byte_stream, mut decoder, mut pending)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (byte_stream, decoder, pending)));
                }
                if decoder.is_closed() {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => pending.extend(decoder.feed(&bytes)),
                    Some(Err(e)) => {
                        decoder.close();
                        let error = ApiError::Stream(e.to_string());
                        return Some((Err(error), (byte_stream, decoder, pending)));
                    }
                    None => {
                        decoder.close();
                        return None;
                    }
                }
            }
        },
    );

    Box::pin(stream)
}
