//! `OpenAI`-compatible chat completions in front of AWS Bedrock
//!
//! Requests are translated per model family by an [`adapter::ModelAdapter`],
//! sent through a [`backend::ModelBackend`], and answered as complete
//! responses or SSE chunk streams by the [`Gateway`]. Tool calls the model
//! writes inline between `TOOL_START` and `TOOL_END` are extracted by
//! [`marker`] and handed back to the caller.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod adapter;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod gateway;
#[cfg(feature = "http")]
pub mod handler;
pub mod marker;
pub mod routing;
pub mod types;
pub mod usage;

pub use catalog::ModelCatalog;
pub use error::LlmError;
pub use gateway::{CompletionStream, Gateway, StreamItem};
#[cfg(feature = "http")]
pub use handler::llm_router;
pub use routing::ToolRouting;
pub use types::{CompletionRequest, CompletionResponse, StreamChunk};
