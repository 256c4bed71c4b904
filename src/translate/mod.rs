//! Request translation between the inbound OpenAI-compatible dialect and the
//! upstream NIM dialect.

pub mod request;
pub mod types;

pub use request::resolve_upstream_request;
pub use types::{ChatCompletionRequest, ChatMessage, ErrorResponse, UpstreamChatRequest};
