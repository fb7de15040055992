use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Server-side tool configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Namespaces whose tool calls are executed by this server
    ///
    /// When unset, every namespace in the capability registry is local.
    #[serde(default)]
    pub local_namespaces: Option<Vec<String>>,
    /// Upper bound for a single capability call
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    #[serde(default)]
    pub databricks: DatabricksToolConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            local_namespaces: None,
            timeout: default_timeout(),
            databricks: DatabricksToolConfig::default(),
        }
    }
}

/// Databricks Genie defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabricksToolConfig {
    /// Workspace used when a tenant header does not name one
    #[serde(default)]
    pub workspace_url: Option<Url>,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
