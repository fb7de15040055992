use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use url::Url;

use super::{CortexApi, DownstreamError, SnowflakeCredentials, Statement, json_or_error};

const MAX_POLLS: usize = 30;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// reqwest client for the Snowflake SQL API
///
/// Statements go to `https://{account}.snowflakecomputing.com/api/v2/statements`;
/// values always travel as bind variables.
#[derive(Debug, Clone)]
pub struct HttpCortexClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpCortexClient {
    pub fn new(timeout: Duration) -> Result<Self, DownstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    fn statements_url(account: &str) -> Result<Url, DownstreamError> {
        let valid = !account.is_empty()
            && account
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(DownstreamError::InvalidEndpoint(format!(
                "'{account}' is not a valid Snowflake account identifier"
            )));
        }

        Url::parse(&format!("https://{account}.snowflakecomputing.com/api/v2/statements"))
            .map_err(|e| DownstreamError::InvalidEndpoint(e.to_string()))
    }

    fn body(&self, statement: &Statement) -> Value {
        let mut body = Map::new();
        body.insert("statement".to_owned(), Value::from(statement.sql.as_str()));
        body.insert("timeout".to_owned(), Value::from(self.timeout.as_secs()));
        if !statement.bindings.is_empty() {
            body.insert("bindings".to_owned(), Value::Object(statement.bindings.clone()));
        }
        if let Some(database) = &statement.database {
            body.insert("database".to_owned(), Value::from(database.as_str()));
        }
        if let Some(warehouse) = &statement.warehouse {
            body.insert("warehouse".to_owned(), Value::from(warehouse.as_str()));
        }
        Value::Object(body)
    }

    /// Poll an asynchronously executing statement until it has a result
    async fn poll(&self, creds: &SnowflakeCredentials, url: &Url, handle: &str) -> Result<Value, DownstreamError> {
        let mut status_url = url.clone();
        status_url
            .path_segments_mut()
            .map_err(|()| DownstreamError::InvalidEndpoint(url.to_string()))?
            .push(handle);

        for _ in 0..MAX_POLLS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .http
                .get(status_url.clone())
                .bearer_auth(creds.token.expose_secret())
                .send()
                .await?;
            if response.status() != reqwest::StatusCode::ACCEPTED {
                return json_or_error(response).await;
            }
        }

        Err(DownstreamError::Pending {
            handle: handle.to_owned(),
        })
    }
}

#[async_trait]
impl CortexApi for HttpCortexClient {
    async fn execute(&self, creds: &SnowflakeCredentials, statement: &Statement) -> Result<Value, DownstreamError> {
        let url = Self::statements_url(&creds.account)?;
        tracing::debug!(account = %creds.account, user = %creds.user, "snowflake statement");

        let response = self
            .http
            .post(url.clone())
            .bearer_auth(creds.token.expose_secret())
            .json(&self.body(statement))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::ACCEPTED {
            let pending = json_or_error(response).await?;
            let Some(handle) = pending.get("statementHandle").and_then(Value::as_str) else {
                return Ok(pending);
            };
            return self.poll(creds, &url, handle).await;
        }

        json_or_error(response).await
    }
}
