use relay_config::LlmConfig;

use crate::adapter::{LlamaAdapter, ModelAdapter, NovaAdapter};
use crate::error::LlmError;

/// Built-in aliases with their default backend identifiers
const BUILTIN: &[(&str, &str, &dyn ModelAdapter)] = &[
    ("llama", "us.meta.llama3-2-3b-instruct-v1:0", &LlamaAdapter),
    ("nova", "amazon.nova-pro-v1:0", &NovaAdapter),
];

/// A resolvable model alias
#[derive(Debug, Clone, Copy)]
pub struct ModelEntry<'a> {
    pub alias: &'a str,
    pub model_id: &'a str,
    pub adapter: &'static dyn ModelAdapter,
}

/// Read-only alias table built at startup
#[derive(Debug)]
pub struct ModelCatalog {
    models: Vec<(String, String, &'static dyn ModelAdapter)>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: BUILTIN
                .iter()
                .map(|&(alias, model_id, adapter)| (alias.to_owned(), model_id.to_owned(), adapter))
                .collect(),
        }
    }
}

impl ModelCatalog {
    /// Built-in table with backend identifiers overridden from configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut catalog = Self::default();

        for (alias, model) in &config.models {
            match catalog.models.iter_mut().find(|(known, _, _)| known == alias) {
                Some((_, model_id, _)) => model_id.clone_from(&model.model_id),
                None => tracing::warn!(alias = %alias, "ignoring override for unknown model alias"),
            }
        }

        catalog
    }

    /// Look up an alias
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnsupportedModel`] naming the available aliases
    pub fn resolve(&self, alias: &str) -> Result<ModelEntry<'_>, LlmError> {
        self.models
            .iter()
            .find(|(known, _, _)| known == alias)
            .map(|(alias, model_id, adapter)| ModelEntry {
                alias,
                model_id,
                adapter: *adapter,
            })
            .ok_or_else(|| LlmError::UnsupportedModel {
                model: alias.to_owned(),
                available: self.aliases().map(str::to_owned).collect(),
            })
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|(alias, _, _)| alias.as_str())
    }
}
