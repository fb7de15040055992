use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Aliases a `[llm.models.<alias>]` override may name
pub const KNOWN_MODEL_ALIASES: &[&str] = &["llama", "nova"];

/// Model backend configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Upper bound for a single backend call, streaming included
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    /// AWS Bedrock runtime settings
    #[serde(default)]
    pub bedrock: BedrockConfig,
    /// Per-alias overrides keyed by alias (e.g. `llama`, `nova`)
    #[serde(default)]
    pub models: IndexMap<String, ModelOverride>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            bedrock: BedrockConfig::default(),
            models: IndexMap::new(),
        }
    }
}

/// AWS Bedrock runtime settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID (optional, uses default credential chain if absent)
    #[serde(default)]
    pub access_key_id: Option<SecretString>,
    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<SecretString>,
    /// Endpoint override, for local emulators
    #[serde(default)]
    pub endpoint_url: Option<Url>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
        }
    }
}

/// Override for a built-in model alias
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOverride {
    /// Backend model identifier to invoke for this alias
    pub model_id: String,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_region() -> String {
    "us-east-1".to_owned()
}
