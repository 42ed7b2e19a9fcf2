//! Incremental `data: ` line decoder
//!
//! Network chunks are arbitrary slices of the response body: a chunk may end
//! in the middle of a line or in the middle of a multi-byte character. The
//! decoder keeps raw bytes until a full line is available and only then
//! decodes it, so neither case needs special handling.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use super::events::StreamEvent;
use crate::api::ApiError;

/// Prefix of every event line
pub const DATA_PREFIX: &str = "data: ";

/// Longest line the decoder buffers before dropping it
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Splits a byte stream into lines and parses the `data: ` ones
#[derive(Debug)]
pub struct EventDecoder {
    /// Bytes of the current, incomplete line
    buffer: Vec<u8>,
    /// Skipping the rest of an overlong line
    discarding: bool,
    max_line_bytes: usize,
    /// Lines that carried a payload we could not parse, or were too long
    malformed: u64,
    /// Events successfully decoded
    decoded: u64,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
            max_line_bytes: MAX_LINE_BYTES,
            malformed: 0,
            decoded: 0,
        }
    }
}

impl EventDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the longest line to buffer
    #[must_use]
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Feed a chunk and return the events completed by it, in order
    ///
    /// Only the new chunk is scanned for line breaks.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let (line, tail) = (&rest[..pos], &rest[pos + 1..]);
            rest = tail;

            if self.discarding {
                self.discarding = false;
            } else if self.buffer.len() + line.len() > self.max_line_bytes {
                self.buffer.clear();
                self.drop_overlong_line();
            } else if self.buffer.is_empty() {
                events.extend(self.decode_line(line));
            } else {
                self.buffer.extend_from_slice(line);
                let line = std::mem::take(&mut self.buffer);
                events.extend(self.decode_line(&line));
            }
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            if self.buffer.len() > self.max_line_bytes {
                self.buffer.clear();
                self.discarding = true;
                self.drop_overlong_line();
            }
        }
        events
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.discarding = false;
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line).into_iter().collect()
    }

    /// Number of lines skipped because their JSON was invalid or they were
    /// too long
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }

    /// Number of events decoded so far
    #[must_use]
    pub fn decoded_events(&self) -> u64 {
        self.decoded
    }

    fn drop_overlong_line(&mut self) {
        self.malformed += 1;
        tracing::warn!(max_bytes = self.max_line_bytes, "Skipping overlong stream line");
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let line = String::from_utf8_lossy(raw);

        match parse_line(&line)? {
            Ok(event) => {
                self.decoded += 1;
                Some(event)
            }
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(error = %e, line = %line, "Skipping malformed stream event");
                None
            }
        }
    }
}

/// Parse one already-split line
///
/// Returns `None` for lines that are not `data: ` lines, and the parse result
/// otherwise. A trailing `\r` is ignored.
pub fn parse_line(line: &str) -> Option<Result<StreamEvent, serde_json::Error>> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.strip_prefix(DATA_PREFIX)
        .map(serde_json::from_str::<StreamEvent>)
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: EventDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

/// Turn a response body into a lazy, ordered stream of events
///
/// Malformed lines are skipped. A read error ends the stream with a single
/// `Err`; events that were still buffered at that point are dropped.
pub fn event_stream<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, ApiError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: EventDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(ApiError::Stream(e.to_string())), state));
                }
                None => {
                    state.finished = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    tracing::debug!(
                        decoded = state.decoder.decoded_events(),
                        malformed = state.decoder.malformed_lines(),
                        "Stream body ended"
                    );
                }
            }
        }
    })
}
