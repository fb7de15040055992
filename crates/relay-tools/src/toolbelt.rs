use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use relay_config::ToolsConfig;
use relay_llm::types::ToolSpec;
use relay_policy::{ServiceKind, TenantPolicy};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::capabilities;
use crate::downstream::{DatabricksCredentials, Downstream, DownstreamError, SnowflakeCredentials};
use crate::error::ToolError;
use crate::outcome::ToolOutcome;
use crate::registry::{CapabilityResult, CapabilitySpec, Credentials, Invocation, Registry};

/// Argument names only the gate may set
pub const RESERVED_ARGS: &[&str] = &["token", "workspace_url", "account", "user"];

/// Policy-checked dispatcher over the capability registry
///
/// Cheap to clone; the registry and downstream clients are shared
/// read-only across requests.
#[derive(Debug, Clone)]
pub struct Toolbelt {
    inner: Arc<ToolbeltInner>,
}

#[derive(Debug)]
struct ToolbeltInner {
    registry: Registry,
    downstream: Downstream,
    timeout: Duration,
    default_workspace: Option<Url>,
}

impl Toolbelt {
    pub fn new(registry: Registry, downstream: Downstream, config: &ToolsConfig) -> Self {
        Self {
            inner: Arc::new(ToolbeltInner {
                registry,
                downstream,
                timeout: config.timeout,
                default_workspace: config.databricks.workspace_url.clone(),
            }),
        }
    }

    /// Built-in capabilities backed by the HTTP downstream clients
    pub fn from_config(config: &ToolsConfig) -> Result<Self, DownstreamError> {
        let downstream = Downstream::http(config.timeout)?;
        let toolbelt = Self::new(capabilities::builtin(), downstream, config);

        tracing::info!(
            capabilities = toolbelt.registry().len(),
            namespaces = ?toolbelt.registry().namespaces(),
            "capability registry initialized"
        );

        Ok(toolbelt)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Tools visible under `policy`: `server.*` always, service namespaces
    /// only when the service is enabled
    pub fn available_tools(&self, policy: &TenantPolicy) -> Vec<ToolSpec> {
        self.registry()
            .iter()
            .filter(|spec| spec.service().is_none_or(|kind| policy.is_service_enabled(kind.name())))
            .map(CapabilitySpec::tool_spec)
            .collect()
    }

    /// Run one tool call under `policy`
    ///
    /// `arguments` may be a JSON object, a JSON-encoded object string (as
    /// found in a tool call) or null. Never fails: every problem is
    /// reported through the envelope.
    pub async fn execute(
        &self,
        name: &str,
        arguments: Value,
        policy: &TenantPolicy,
        cancel: &CancellationToken,
    ) -> ToolOutcome {
        let result = self.dispatch(name, arguments, policy, cancel).await;

        match &result {
            Ok(_) => tracing::info!(capability = name, "tool call succeeded"),
            Err(e @ ToolError::Unauthorized(_)) => tracing::warn!(capability = name, error = %e, "tool call denied"),
            Err(e) => tracing::warn!(capability = name, error = %e, "tool call failed"),
        }

        ToolOutcome::from(result)
    }

    async fn dispatch(
        &self,
        name: &str,
        arguments: Value,
        policy: &TenantPolicy,
        cancel: &CancellationToken,
    ) -> CapabilityResult {
        let spec = self
            .registry()
            .resolve(name)
            .ok_or_else(|| ToolError::UnknownTool { name: name.to_owned() })?;

        let mut args = argument_object(arguments)?;
        for reserved in RESERVED_ARGS {
            if args.remove(*reserved).is_some() {
                tracing::debug!(capability = %spec.qualified_name(), argument = reserved, "dropped reserved argument");
            }
        }
        spec.check_args(&args)?;

        let service = spec.service();
        if let Some(kind) = service {
            policy.authorize(kind.name(), spec.name, &spec.resources(&args))?;
        }

        let invocation = Invocation {
            credentials: self.credentials(service, policy)?,
            args,
            downstream: self.inner.downstream.clone(),
            enabled_services: policy.enabled_services(),
            capability_count: self.registry().len(),
        };

        let call = AssertUnwindSafe(spec.call(invocation)).catch_unwind();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ToolError::Cancelled),
            outcome = tokio::time::timeout(self.inner.timeout, call) => match outcome {
                Err(_) => Err(ToolError::Timeout(self.inner.timeout)),
                Ok(Err(_)) => {
                    tracing::error!(capability = %spec.qualified_name(), "capability panicked");
                    Err(ToolError::Panicked)
                }
                Ok(Ok(result)) => result,
            },
        }
    }

    /// Credentials for an authorized call on `service`
    fn credentials(&self, service: Option<ServiceKind>, policy: &TenantPolicy) -> Result<Credentials, ToolError> {
        let Some(kind) = service else {
            return Ok(Credentials::None);
        };
        let Some(sub) = policy.service(kind) else {
            return Err(ToolError::NotConfigured(format!("{kind} is not configured for this request")));
        };
        let token = SecretString::from(sub.token().expose_secret().to_owned());

        match kind {
            ServiceKind::Databricks => {
                let workspace_url = match sub.field("workspace_url") {
                    Some(raw) => Url::parse(raw).map_err(|_| {
                        ToolError::NotConfigured(format!("databricks workspace URL '{raw}' is not a valid URL"))
                    })?,
                    None => self.inner.default_workspace.clone().ok_or_else(|| {
                        ToolError::NotConfigured(
                            "databricks workspace URL is not configured; set Workspace_Url in X-Enable-Databricks"
                                .to_owned(),
                        )
                    })?,
                };
                Ok(Credentials::Databricks(DatabricksCredentials { token, workspace_url }))
            }
            ServiceKind::Snowflake => {
                let field = |name: &str| sub.field(name).unwrap_or_default().to_owned();
                Ok(Credentials::Snowflake(SnowflakeCredentials {
                    token,
                    account: field("account"),
                    user: field("user"),
                }))
            }
        }
    }
}

/// Normalise tool-call arguments into an object
fn argument_object(arguments: Value) -> Result<Map<String, Value>, ToolError> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ToolError::invalid("arguments", "a JSON object")),
        },
        _ => Err(ToolError::invalid("arguments", "a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::{HeaderMap, HeaderName, HeaderValue};
    use serde_json::json;

    use super::*;
    use crate::capabilities::tests::Recorder;
    use crate::registry::ParamSpec;

    fn policy(pairs: &[(&'static str, &'static str)]) -> TenantPolicy {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        TenantPolicy::from_headers(&headers).unwrap()
    }

    fn config() -> ToolsConfig {
        ToolsConfig {
            timeout: Duration::from_secs(5),
            ..ToolsConfig::default()
        }
    }

    fn toolbelt(recorder: Recorder) -> (Toolbelt, Arc<Recorder>) {
        let (downstream, recorder) = recorder.downstream();
        (Toolbelt::new(capabilities::builtin(), downstream, &config()), recorder)
    }

    async fn run(toolbelt: &Toolbelt, name: &str, args: Value, policy: &TenantPolicy) -> Value {
        toolbelt
            .execute(name, args, policy, &CancellationToken::new())
            .await
            .to_value()
    }

    #[tokio::test]
    async fn disabled_service_is_never_invoked() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[
            ("x-enable-databricks", "Token=tok; Enabled=false; Workspace_Url=https://w.example"),
            ("x-enable-databricks-space", "spaceA"),
        ]);

        let outcome = run(&toolbelt, "databricks.get_space", json!({"space_id": "spaceA"}), &policy).await;

        assert_eq!(outcome["success"], false);
        assert!(
            outcome["error"]
                .as_str()
                .unwrap()
                .starts_with("Unauthorized operation: databricks.get_space - ")
        );
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn allowed_space_is_dispatched_with_injected_workspace() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[
            ("x-enable-databricks", "Token=tok; Workspace_Url=https://w.example"),
            ("x-enable-databricks-space", "spaceA"),
        ]);

        let outcome = run(&toolbelt, "databricks_get_space", json!(r#"{"space_id":"spaceA"}"#), &policy).await;
        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["space"]["title"], "Sales");

        let outcome = run(&toolbelt, "list_spaces", Value::Null, &policy).await;
        assert_eq!(outcome["spaces"].as_array().unwrap().len(), 2);

        assert_eq!(
            recorder.calls(),
            vec!["get_space:spaceA", "list_spaces@https://w.example/"]
        );
    }

    #[tokio::test]
    async fn space_outside_allowlist_is_denied() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[("x-enable-databricks", "Token=tok; Workspace_Url=https://w.example")]);

        let outcome = run(
            &toolbelt,
            "databricks.start_conversation",
            json!({"space_id": "spaceA", "content": "hi"}),
            &policy,
        )
        .await;

        assert_eq!(
            outcome["error"],
            "Unauthorized operation: databricks.start_conversation - 'spaceA' is not in the allowed spaces"
        );
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn model_cannot_supply_credentials() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[
            ("x-enable-snowflake", "Token=real; Account=acme; User=analyst"),
            ("x-enable-snowflake-database", "SALES"),
        ]);

        let outcome = run(
            &toolbelt,
            "snowflake.execute_sql",
            json!({"database": "SALES", "sql": "SELECT 1", "account": "evil", "token": "forged"}),
            &policy,
        )
        .await;

        assert_eq!(outcome["success"], true);
        assert_eq!(recorder.calls(), vec!["execute@acme"]);
    }

    #[tokio::test]
    async fn warehouse_is_checked_against_clusters() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[
            ("x-enable-snowflake", "Token=t; Account=acme; User=u"),
            ("x-enable-snowflake-database", "SALES"),
            ("x-enable-snowflake-cluster", "WH1"),
        ]);

        let denied = run(
            &toolbelt,
            "snowflake.execute_sql",
            json!({"database": "SALES", "sql": "SELECT 1", "warehouse": "BIG"}),
            &policy,
        )
        .await;
        assert_eq!(denied["success"], false);

        let allowed = run(
            &toolbelt,
            "snowflake.execute_sql",
            json!({"database": "SALES", "sql": "SELECT ?", "warehouse": "WH1", "parameters": {"1": {"type": "TEXT", "value": "x"}}}),
            &policy,
        )
        .await;
        assert_eq!(allowed["success"], true);

        let statements = recorder.statements.lock().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].warehouse.as_deref(), Some("WH1"));
        assert_eq!(statements[0].bindings["1"]["value"], "x");
    }

    #[tokio::test]
    async fn cortex_functions_use_bind_variables() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[("x-enable-snowflake", "Token=t; Account=acme; User=u")]);

        let outcome = run(
            &toolbelt,
            "snowflake.summarize_text",
            json!({"text": "'); DROP TABLE x; --"}),
            &policy,
        )
        .await;
        assert_eq!(outcome["success"], true);

        let statements = recorder.statements.lock().unwrap();
        assert_eq!(statements[0].sql, "SELECT SNOWFLAKE.CORTEX.SUMMARIZE(?) AS summary");
        assert_eq!(statements[0].bindings["1"]["value"], "'); DROP TABLE x; --");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_envelope_failure() {
        let (toolbelt, _) = toolbelt(Recorder::default());

        let outcome = run(&toolbelt, "weather.lookup", json!({}), &TenantPolicy::default()).await;
        assert_eq!(outcome, json!({"success": false, "error": "Unknown server tool: weather.lookup"}));
    }

    #[tokio::test]
    async fn server_status_needs_no_policy() {
        let (toolbelt, _) = toolbelt(Recorder::default());
        let policy = policy(&[("x-enable-databricks", "Token=d")]);

        let outcome = run(&toolbelt, "server.get_status", json!({}), &policy).await;
        assert_eq!(
            outcome,
            json!({"success": true, "status": "ok", "enabled_services": ["databricks"], "capabilities": 12})
        );
    }

    #[tokio::test]
    async fn missing_workspace_is_reported() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[("x-enable-databricks", "Token=d")]);

        let outcome = run(&toolbelt, "databricks.list_spaces", json!({}), &policy).await;
        assert_eq!(outcome["success"], false);
        assert!(outcome["error"].as_str().unwrap().contains("workspace URL is not configured"));
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn configured_workspace_is_the_fallback() {
        let (downstream, recorder) = Recorder::default().downstream();
        let mut config = config();
        config.databricks.workspace_url = Some(Url::parse("https://fallback.example").unwrap());
        let toolbelt = Toolbelt::new(capabilities::builtin(), downstream, &config);

        let policy = policy(&[("x-enable-databricks", "Token=d")]);
        let outcome = run(&toolbelt, "databricks.get_databricks_status", json!({}), &policy).await;

        assert_eq!(outcome["success"], true);
        assert_eq!(outcome["spaces_count"], 2);
        assert_eq!(recorder.calls(), vec!["list_spaces@https://fallback.example/"]);
    }

    #[tokio::test]
    async fn downstream_errors_become_envelopes() {
        let (toolbelt, _) = toolbelt(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let policy = policy(&[("x-enable-snowflake", "Token=t; Account=acme; User=u")]);

        let outcome = run(&toolbelt, "snowflake.get_snowflake_status", json!({}), &policy).await;
        assert_eq!(
            outcome,
            json!({"success": false, "error": "API error (403): invalid access token"})
        );
    }

    #[tokio::test]
    async fn bad_arguments_are_rejected_before_dispatch() {
        let (toolbelt, recorder) = toolbelt(Recorder::default());
        let policy = policy(&[("x-enable-snowflake", "Token=t; Account=acme; User=u")]);

        let outcome = run(&toolbelt, "snowflake.complete_text", json!("not json"), &policy).await;
        assert_eq!(outcome["error"], "argument 'arguments' must be a JSON object");

        let outcome = run(&toolbelt, "snowflake.complete_text", json!({"model": "m"}), &policy).await;
        assert_eq!(outcome["error"], "missing required argument 'prompt'");

        assert!(recorder.calls().is_empty());
    }

    async fn explode(_: Invocation) -> CapabilityResult {
        panic!("capability bug")
    }

    async fn stall(_: Invocation) -> CapabilityResult {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Map::new())
    }

    fn custom(spec: CapabilitySpec, timeout: Duration) -> Toolbelt {
        let mut registry = Registry::new();
        registry.register(spec);
        let (downstream, _) = Recorder::default().downstream();
        Toolbelt::new(
            registry,
            downstream,
            &ToolsConfig {
                timeout,
                ..ToolsConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let toolbelt = custom(CapabilitySpec::new("server", "explode", "Panics", explode), Duration::from_secs(5));

        let outcome = run(&toolbelt, "server.explode", json!({}), &TenantPolicy::default()).await;
        assert_eq!(outcome, json!({"success": false, "error": "tool call failed unexpectedly"}));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_capabilities_time_out() {
        let toolbelt = custom(CapabilitySpec::new("server", "stall", "Hangs", stall), Duration::from_secs(2));

        let outcome = run(&toolbelt, "server.stall", json!({}), &TenantPolicy::default()).await;
        assert_eq!(outcome["error"], "tool call timed out after 2s");
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let toolbelt = custom(CapabilitySpec::new("server", "stall", "Hangs", stall), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = toolbelt
            .execute("server.stall", json!({}), &TenantPolicy::default(), &cancel)
            .await;
        assert_eq!(outcome.error.as_deref(), Some("tool call cancelled"));
    }

    #[tokio::test]
    async fn handler_receives_only_clean_arguments() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        async fn echo(invocation: Invocation) -> CapabilityResult {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(invocation.args)
        }

        let toolbelt = custom(
            CapabilitySpec::new("server", "echo", "Echo", echo).param(ParamSpec::optional("note")),
            Duration::from_secs(5),
        );

        let outcome = run(
            &toolbelt,
            "echo",
            json!({"note": "n", "user": "root", "workspace_url": "x"}),
            &TenantPolicy::default(),
        )
        .await;

        assert_eq!(outcome, json!({"success": true, "note": "n"}));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn available_tools_follow_enabled_services() {
        let (toolbelt, _) = toolbelt(Recorder::default());

        let names = |policy: &TenantPolicy| -> Vec<String> {
            toolbelt
                .available_tools(policy)
                .into_iter()
                .map(|t| t.function.name)
                .collect()
        };

        assert_eq!(names(&TenantPolicy::default()), vec!["server.get_status"]);

        let databricks = policy(&[("x-enable-databricks", "Token=d")]);
        let visible = names(&databricks);
        assert_eq!(visible.len(), 7);
        assert!(visible.iter().all(|n| n.starts_with("server.") || n.starts_with("databricks.")));
    }
}
