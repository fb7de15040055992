use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use url::Url;

use super::{DatabricksCredentials, DownstreamError, GenieApi, json_or_error};

/// reqwest client for `{workspace}/api/2.0/genie`
#[derive(Debug, Clone)]
pub struct HttpGenieClient {
    http: reqwest::Client,
}

impl HttpGenieClient {
    pub fn new(timeout: Duration) -> Result<Self, DownstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Genie endpoint under the workspace, path segments percent-encoded
    fn endpoint(workspace: &Url, segments: &[&str]) -> Result<Url, DownstreamError> {
        let mut url = workspace.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| DownstreamError::InvalidEndpoint(format!("{workspace} cannot be a base URL")))?;
            path.pop_if_empty().extend(["api", "2.0", "genie"]).extend(segments);
        }
        Ok(url)
    }

    async fn get(&self, creds: &DatabricksCredentials, segments: &[&str]) -> Result<Value, DownstreamError> {
        let url = Self::endpoint(&creds.workspace_url, segments)?;
        tracing::debug!(%url, "genie GET");

        let response = self
            .http
            .get(url)
            .bearer_auth(creds.token.expose_secret())
            .send()
            .await?;
        json_or_error(response).await
    }

    async fn post(
        &self,
        creds: &DatabricksCredentials,
        segments: &[&str],
        body: &Value,
    ) -> Result<Value, DownstreamError> {
        let url = Self::endpoint(&creds.workspace_url, segments)?;
        tracing::debug!(%url, "genie POST");

        let response = self
            .http
            .post(url)
            .bearer_auth(creds.token.expose_secret())
            .json(body)
            .send()
            .await?;
        json_or_error(response).await
    }
}

#[async_trait]
impl GenieApi for HttpGenieClient {
    async fn list_spaces(&self, creds: &DatabricksCredentials) -> Result<Value, DownstreamError> {
        self.get(creds, &["spaces"]).await
    }

    async fn get_space(&self, creds: &DatabricksCredentials, space_id: &str) -> Result<Value, DownstreamError> {
        self.get(creds, &["spaces", space_id]).await
    }

    async fn start_conversation(
        &self,
        creds: &DatabricksCredentials,
        space_id: &str,
        content: &str,
    ) -> Result<Value, DownstreamError> {
        let body = json!({"space_id": space_id, "content": content});
        self.post(creds, &["conversations"], &body).await
    }

    async fn post_message(
        &self,
        creds: &DatabricksCredentials,
        conversation_id: &str,
        content: &str,
        attachments: Option<&Value>,
    ) -> Result<Value, DownstreamError> {
        let mut body = json!({"content": content});
        if let Some(attachments) = attachments {
            body["attachments"] = attachments.clone();
        }
        self.post(creds, &["conversations", conversation_id, "messages"], &body)
            .await
    }

    async fn get_conversation(
        &self,
        creds: &DatabricksCredentials,
        conversation_id: &str,
    ) -> Result<Value, DownstreamError> {
        self.get(creds, &["conversations", conversation_id]).await
    }
}
