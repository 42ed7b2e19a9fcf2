//! Assistant Service API
//!
//! Typed access to the REST endpoints of the assistant service:
//!
//! | Endpoint | Method |
//! |---|---|
//! | `GET /v1/models` | [`LightspeedApi::list_models`] |
//! | `POST /v1/query` | [`LightspeedApi::query`] |
//! | `POST /v1/streaming_query` | [`LightspeedApi::streaming_query`] |
//! | `GET /v1/conversations/{id}` | [`LightspeedApi::get_conversation`] |
//! | `DELETE /v1/conversations/{id}` | [`LightspeedApi::delete_conversation`] |

mod client;
mod error;
pub mod types;

pub use client::{EventStream, LightspeedApi, LightspeedClient};
pub use error::ApiError;
pub use types::{
    ChatTurn, ConversationResponse, HistoryMessage, HistoryRole, Model, ModelsResponse,
    QueryAttachment, QueryRequest, QueryResponse, ToolCallPayload,
};
