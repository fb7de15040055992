use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Expands `{{ env.VAR }}` placeholders, parses, then validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus file access
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_llm_config()?;
        self.validate_tools_config()?;
        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        if self.llm.timeout.is_zero() {
            anyhow::bail!("llm.timeout must be greater than zero");
        }

        let bedrock = &self.llm.bedrock;
        let has_key = bedrock
            .access_key_id
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty());
        let has_secret = bedrock
            .secret_access_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty());
        if has_key != has_secret {
            anyhow::bail!("llm.bedrock requires both access_key_id and secret_access_key, or neither");
        }

        for (alias, model) in &self.llm.models {
            if !crate::KNOWN_MODEL_ALIASES.contains(&alias.as_str()) {
                anyhow::bail!(
                    "llm.models.{alias} does not name a known model alias (expected one of: {})",
                    crate::KNOWN_MODEL_ALIASES.join(", ")
                );
            }
            if model.model_id.trim().is_empty() {
                anyhow::bail!("llm.models.{alias}.model_id must not be empty");
            }
        }

        Ok(())
    }

    fn validate_tools_config(&self) -> anyhow::Result<()> {
        if self.tools.timeout.is_zero() {
            anyhow::bail!("tools.timeout must be greater than zero");
        }

        for namespace in self.tools.local_namespaces.iter().flatten() {
            if namespace.is_empty() || namespace.contains('.') {
                anyhow::bail!("tools.local_namespaces entry '{namespace}' must be a non-empty name without dots");
            }
        }

        Ok(())
    }
}
