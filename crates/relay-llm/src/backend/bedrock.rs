//! AWS Bedrock runtime backend using `InvokeModel`

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::ResponseStream;
use aws_smithy_types::Blob;
use futures_util::stream;
use relay_config::BedrockConfig;
use secrecy::ExposeSecret;
use serde_json::Value;

use super::{BackendEventStream, ModelBackend};
use crate::error::LlmError;

const JSON: &str = "application/json";

/// Bedrock runtime client shared by all requests
#[derive(Debug, Clone)]
pub struct BedrockBackend {
    client: BedrockClient,
}

impl BedrockBackend {
    /// Build a client from configuration
    ///
    /// Static credentials are used when both halves are non-empty, otherwise
    /// the default AWS credential chain applies.
    pub async fn from_config(config: &BedrockConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        let access_key = config.access_key_id.as_ref().map(|k| k.expose_secret()).filter(|k| !k.is_empty());
        let secret_key = config
            .secret_access_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.is_empty());

        if let (Some(access_key), Some(secret_key)) = (access_key, secret_key) {
            let credentials = aws_credential_types::Credentials::new(access_key, secret_key, None, None, "relay-config");
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.as_str());
        }

        let sdk_config = loader.load().await;
        Self::from_client(BedrockClient::new(&sdk_config))
    }

    pub const fn from_client(client: BedrockClient) -> Self {
        Self { client }
    }
}

fn decode(bytes: &[u8]) -> Result<Value, LlmError> {
    serde_json::from_slice(bytes).map_err(|e| LlmError::Backend(format!("undecodable backend payload: {e}")))
}

#[async_trait]
impl ModelBackend for BedrockBackend {
    async fn invoke(&self, model_id: &str, payload: &Value) -> Result<Value, LlmError> {
        let body = serde_json::to_vec(payload).map_err(|e| LlmError::Internal(e.to_string()))?;

        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model_id, error = %DisplayErrorContext(&e), "bedrock invoke_model failed");
                LlmError::Backend(format!("invoke_model failed for {model_id}"))
            })?;

        decode(output.body().as_ref())
    }

    async fn invoke_stream(&self, model_id: &str, payload: &Value) -> Result<BackendEventStream, LlmError> {
        let body = serde_json::to_vec(payload).map_err(|e| LlmError::Internal(e.to_string()))?;

        let output = self
            .client
            .invoke_model_with_response_stream()
            .model_id(model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model_id, error = %DisplayErrorContext(&e), "bedrock invoke_model_with_response_stream failed");
                LlmError::Backend(format!("invoke_model_with_response_stream failed for {model_id}"))
            })?;

        let events = stream::unfold(Some(output.body), |receiver| async move {
            let mut receiver = receiver?;

            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        let Some(bytes) = part.bytes() else {
                            continue;
                        };
                        return Some((decode(bytes.as_ref()), Some(receiver)));
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => return None,
                    Err(e) => {
                        tracing::error!(error = %DisplayErrorContext(&e), "bedrock response stream failed");
                        return Some((Err(LlmError::Backend("response stream interrupted".to_owned())), None));
                    }
                }
            }
        });

        Ok(Box::pin(events))
    }
}
