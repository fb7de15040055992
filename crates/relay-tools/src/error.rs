use std::time::Duration;

use relay_policy::UnauthorizedOperation;
use thiserror::Error;

use crate::downstream::DownstreamError;

/// Reasons a tool call fails
///
/// None of these are HTTP failures: the gate folds every variant into a
/// `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown server tool: {name}")]
    UnknownTool { name: String },

    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedOperation),

    #[error("missing required argument '{name}'")]
    MissingArgument { name: String },

    #[error("argument '{name}' must be {expected}")]
    InvalidArgument { name: String, expected: &'static str },

    #[error("{0}")]
    NotConfigured(String),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),

    #[error("tool call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("tool call cancelled")]
    Cancelled,

    #[error("tool call failed unexpectedly")]
    Panicked,
}

impl ToolError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            expected,
        }
    }
}
