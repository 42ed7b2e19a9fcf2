//! Streaming Responses
//!
//! `POST /v1/streaming_query` answers with newline-delimited lines of the form
//! `data: {"event": ..., "data": ...}`. This module turns that body into typed
//! events and folds them into an answer.
//!
//! # Pipeline
//!
//! ```text
//!  response body (chunks)
//!          │
//!          ▼
//!   EventDecoder      line framing, `data: ` prefix, JSON (bad lines skipped)
//!          │
//!          ▼
//!   event_stream()    lazy Stream<Item = Result<StreamEvent, ApiError>>
//!          │
//!          ▼
//!   StreamReducer     answer accumulator, tool-execution split
//!          │
//!          ▼
//!   StreamSink        start / token / tool_execution / tool_call / end
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lightspeed_core::stream::{event_stream, StreamReducer};
//!
//! let events = event_stream(response.bytes_stream());
//! let summary = StreamReducer::new().drive(events, &mut sink).await?;
//! println!("{}", summary.content);
//! ```

mod decoder;
mod events;
mod reducer;

pub use decoder::{event_stream, parse_line, EventDecoder, DATA_PREFIX, MAX_LINE_BYTES};
pub use events::{
    EndData, ReferencedDocument, StartData, StreamEvent, TokenData, ToolCallData,
    TOOL_EXECUTION_ROLE,
};
pub use reducer::{StreamReducer, StreamSink, StreamSummary};
