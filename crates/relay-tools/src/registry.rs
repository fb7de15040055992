//! Registration-time table of capabilities

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use relay_llm::types::ToolSpec;
use relay_policy::{ResourceRef, ServiceKind};
use serde_json::{Map, Value, json};

use crate::downstream::{DatabricksCredentials, Downstream, SnowflakeCredentials};
use crate::error::ToolError;

/// Result of a capability before it is wrapped in the envelope
pub type CapabilityResult = Result<Map<String, Value>, ToolError>;

type Handler = Arc<dyn Fn(Invocation) -> BoxFuture<'static, CapabilityResult> + Send + Sync>;

/// Schema type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Free-form JSON (mappings, lists)
    Object,
}

impl ParamKind {
    const fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Object => "object",
        }
    }
}

/// One named parameter of a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Policy allowlist the value must appear in, when present
    pub scope: Option<&'static str>,
}

impl ParamSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: true,
            scope: None,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    #[must_use]
    pub const fn object(mut self) -> Self {
        self.kind = ParamKind::Object;
        self
    }

    #[must_use]
    pub const fn scoped(mut self, allowlist: &'static str) -> Self {
        self.scope = Some(allowlist);
        self
    }
}

/// A locally executable capability
pub struct CapabilitySpec {
    pub namespace: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    handler: Handler,
}

impl CapabilitySpec {
    pub fn new<F, Fut>(namespace: &'static str, name: &'static str, description: &'static str, handler: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CapabilityResult> + Send + 'static,
    {
        Self {
            namespace,
            name,
            description,
            params: Vec::new(),
            handler: Arc::new(move |invocation| Box::pin(handler(invocation))),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Policy service guarding this capability, `None` for `server.*`
    pub fn service(&self) -> Option<ServiceKind> {
        ServiceKind::from_name(self.namespace)
    }

    /// JSON schema of the parameters
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_owned(), json!({"type": p.kind.schema_type()})))
            .collect();
        let required: Vec<&str> = self.params.iter().filter(|p| p.required).map(|p| p.name).collect();

        let mut schema = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec::function(self.qualified_name(), self.description, self.schema())
    }

    /// Check presence and types of the model-supplied arguments
    pub(crate) fn check_args(&self, args: &Map<String, Value>) -> Result<(), ToolError> {
        for param in &self.params {
            match args.get(param.name).filter(|v| !v.is_null()) {
                None if param.required => return Err(ToolError::missing(param.name)),
                Some(value) if param.kind == ParamKind::String && !value.is_string() => {
                    return Err(ToolError::invalid(param.name, "a string"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resource identifiers this call touches, for the policy check
    pub(crate) fn resources<'a>(&self, args: &'a Map<String, Value>) -> Vec<ResourceRef<'a>> {
        self.params
            .iter()
            .filter_map(|param| {
                let allowlist = param.scope?;
                let id = args.get(param.name)?.as_str()?;
                Some(ResourceRef::new(allowlist, id))
            })
            .collect()
    }

    pub(crate) fn call(&self, invocation: Invocation) -> BoxFuture<'static, CapabilityResult> {
        (self.handler)(invocation)
    }
}

impl std::fmt::Debug for CapabilitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySpec")
            .field("name", &self.qualified_name())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Credentials the gate injects for the capability's service
#[derive(Debug)]
pub enum Credentials {
    None,
    Databricks(DatabricksCredentials),
    Snowflake(SnowflakeCredentials),
}

/// Everything a capability receives for one call
#[derive(Debug)]
pub struct Invocation {
    /// Model-supplied arguments, reserved names already removed
    pub args: Map<String, Value>,
    pub credentials: Credentials,
    pub downstream: Downstream,
    pub enabled_services: Vec<ServiceKind>,
    pub capability_count: usize,
}

impl Invocation {
    pub fn str_arg(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name)?.ok_or_else(|| ToolError::missing(name))
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.args.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ToolError::invalid(name, "a string")),
        }
    }

    pub fn opt_value(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub fn databricks(&self) -> Result<&DatabricksCredentials, ToolError> {
        match &self.credentials {
            Credentials::Databricks(creds) => Ok(creds),
            _ => Err(ToolError::NotConfigured("databricks credentials were not provided".to_owned())),
        }
    }

    pub fn snowflake(&self) -> Result<&SnowflakeCredentials, ToolError> {
        match &self.credentials {
            Credentials::Snowflake(creds) => Ok(creds),
            _ => Err(ToolError::NotConfigured("snowflake credentials were not provided".to_owned())),
        }
    }
}

/// Capabilities keyed by qualified name, in registration order
#[derive(Debug, Default)]
pub struct Registry {
    capabilities: IndexMap<String, CapabilitySpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability, replacing one with the same qualified name
    pub fn register(&mut self, spec: CapabilitySpec) -> &mut Self {
        let name = spec.qualified_name();
        if self.capabilities.insert(name.clone(), spec).is_some() {
            tracing::warn!(capability = %name, "capability registered twice, keeping the latest");
        }
        self
    }

    /// Find a capability by any accepted spelling of its name
    ///
    /// Tried in order: the qualified `service.capability` form, the legacy
    /// `service_capability` form, then the bare capability name. The bare
    /// fallback never crosses into another known namespace.
    pub fn resolve(&self, name: &str) -> Option<&CapabilitySpec> {
        if let Some(spec) = self.capabilities.get(name) {
            return Some(spec);
        }

        if !name.contains('.')
            && let Some((namespace, rest)) = name.split_once('_')
            && let Some(spec) = self.capabilities.get(&format!("{namespace}.{rest}"))
        {
            return Some(spec);
        }

        let bare = match name.rsplit_once('.') {
            Some((namespace, _)) if self.capabilities.values().any(|spec| spec.namespace == namespace) => return None,
            Some((_, bare)) => bare,
            None => name,
        };
        self.capabilities.values().find(|spec| spec.name == bare)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySpec> {
        self.capabilities.values()
    }

    /// Distinct namespaces in registration order
    pub fn namespaces(&self) -> Vec<&'static str> {
        let mut namespaces: Vec<&'static str> = Vec::new();
        for spec in self.iter() {
            if !namespaces.contains(&spec.namespace) {
                namespaces.push(spec.namespace);
            }
        }
        namespaces
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_: Invocation) -> CapabilityResult {
        Ok(Map::new())
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(CapabilitySpec::new("server", "get_status", "Status", noop))
            .register(
                CapabilitySpec::new("databricks", "get_space", "Space details", noop)
                    .param(ParamSpec::required("space_id").scoped("spaces")),
            )
            .register(
                CapabilitySpec::new("snowflake", "execute_sql", "Run SQL", noop)
                    .param(ParamSpec::required("database").scoped("databases"))
                    .param(ParamSpec::required("sql"))
                    .param(ParamSpec::optional("warehouse").scoped("clusters"))
                    .param(ParamSpec::optional("parameters").object()),
            );
        registry
    }

    #[test]
    fn names_resolve_in_every_accepted_form() {
        let registry = registry();

        for name in ["databricks.get_space", "databricks_get_space", "get_space", "other.get_space"] {
            assert_eq!(registry.resolve(name).unwrap().qualified_name(), "databricks.get_space", "{name}");
        }
        assert_eq!(registry.resolve("server_get_status").unwrap().qualified_name(), "server.get_status");
        assert!(registry.resolve("databricks.drop_everything").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn bare_fallback_stays_out_of_known_namespaces() {
        let registry = registry();

        assert!(registry.resolve("snowflake.get_space").is_none());
        assert!(registry.resolve("server.execute_sql").is_none());
        assert_eq!(
            registry.resolve("jira.get_space").unwrap().qualified_name(),
            "databricks.get_space"
        );
    }

    #[test]
    fn schema_marks_required_and_object_params() {
        let registry = registry();
        let schema = registry.resolve("snowflake.execute_sql").unwrap().schema();

        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "database": {"type": "string"},
                    "sql": {"type": "string"},
                    "warehouse": {"type": "string"},
                    "parameters": {"type": "object"},
                },
                "required": ["database", "sql"],
            })
        );

        let status = registry.resolve("server.get_status").unwrap().schema();
        assert!(status.get("required").is_none());
    }

    #[test]
    fn argument_checks() {
        let registry = registry();
        let sql = registry.resolve("snowflake.execute_sql").unwrap();

        let args = json!({"database": "SALES", "sql": "SELECT 1", "parameters": {"1": {}}});
        assert!(sql.check_args(args.as_object().unwrap()).is_ok());

        let args = json!({"database": "SALES"});
        let err = sql.check_args(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "missing required argument 'sql'");

        let args = json!({"database": 7, "sql": "SELECT 1"});
        let err = sql.check_args(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "argument 'database' must be a string");
    }

    #[test]
    fn resources_follow_scoped_params() {
        let registry = registry();
        let sql = registry.resolve("snowflake.execute_sql").unwrap();

        let args = json!({"database": "SALES", "sql": "SELECT 1", "warehouse": "WH"});
        let resources = sql.resources(args.as_object().unwrap());
        assert_eq!(
            resources,
            vec![ResourceRef::new("databases", "SALES"), ResourceRef::new("clusters", "WH")]
        );
    }

    #[test]
    fn namespaces_are_distinct_and_ordered() {
        assert_eq!(registry().namespaces(), vec!["server", "databricks", "snowflake"]);
    }
}
