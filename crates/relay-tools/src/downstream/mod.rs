//! Contracts for the services capabilities call out to
//!
//! Credentials travel with every call rather than living in the client, so
//! one client instance serves every tenant.

mod cortex;
mod genie;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub use cortex::HttpCortexClient;
pub use genie::HttpGenieClient;

/// Failures talking to a downstream service
///
/// Built from the response status and body only, never from request
/// headers, so tenant tokens cannot leak through it.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("statement {handle} did not finish in time")]
    Pending { handle: String },
}

/// Injected Databricks identity
#[derive(Debug)]
pub struct DatabricksCredentials {
    pub token: SecretString,
    pub workspace_url: Url,
}

/// Injected Snowflake identity
#[derive(Debug)]
pub struct SnowflakeCredentials {
    pub token: SecretString,
    pub account: String,
    pub user: String,
}

/// Databricks Genie conversation API
#[async_trait]
pub trait GenieApi: Send + Sync {
    async fn list_spaces(&self, creds: &DatabricksCredentials) -> Result<Value, DownstreamError>;

    async fn get_space(&self, creds: &DatabricksCredentials, space_id: &str) -> Result<Value, DownstreamError>;

    async fn start_conversation(
        &self,
        creds: &DatabricksCredentials,
        space_id: &str,
        content: &str,
    ) -> Result<Value, DownstreamError>;

    async fn post_message(
        &self,
        creds: &DatabricksCredentials,
        conversation_id: &str,
        content: &str,
        attachments: Option<&Value>,
    ) -> Result<Value, DownstreamError>;

    async fn get_conversation(
        &self,
        creds: &DatabricksCredentials,
        conversation_id: &str,
    ) -> Result<Value, DownstreamError>;
}

/// One SQL statement with positional bind variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    /// Snowflake SQL API bindings keyed `"1"`, `"2"`, ...
    pub bindings: Map<String, Value>,
    pub database: Option<String>,
    pub warehouse: Option<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Append a `TEXT` bind variable for the next `?`
    #[must_use]
    pub fn bind_text(mut self, value: &str) -> Self {
        let position = (self.bindings.len() + 1).to_string();
        self.bindings
            .insert(position, serde_json::json!({"type": "TEXT", "value": value}));
        self
    }
}

/// Snowflake SQL API, used for plain SQL and Cortex functions
#[async_trait]
pub trait CortexApi: Send + Sync {
    async fn execute(&self, creds: &SnowflakeCredentials, statement: &Statement) -> Result<Value, DownstreamError>;
}

/// Downstream clients shared by all capabilities
#[derive(Clone)]
pub struct Downstream {
    pub genie: Arc<dyn GenieApi>,
    pub cortex: Arc<dyn CortexApi>,
}

impl Downstream {
    /// HTTP clients with a per-request timeout
    pub fn http(timeout: std::time::Duration) -> Result<Self, DownstreamError> {
        Ok(Self {
            genie: Arc::new(HttpGenieClient::new(timeout)?),
            cortex: Arc::new(HttpCortexClient::new(timeout)?),
        })
    }
}

impl std::fmt::Debug for Downstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downstream").finish_non_exhaustive()
    }
}

/// Turn a non-success response into an [`DownstreamError::Api`]
async fn json_or_error(response: reqwest::Response) -> Result<Value, DownstreamError> {
    let status = response.status();
    if status.is_success() {
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Object(Map::new()));
        }
        Ok(response.json().await?)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(DownstreamError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
