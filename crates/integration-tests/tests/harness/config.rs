//! Builder for test configurations
//!
//! Produces the same TOML a deployment would use, so the config layer is
//! exercised end to end.

use relay_config::Config;

/// Fluent builder for relay test configs
pub struct ConfigBuilder {
    health: bool,
    llm_timeout: &'static str,
    tools_timeout: &'static str,
    local_namespaces: Option<Vec<&'static str>>,
    workspace_url: Option<&'static str>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            health: true,
            llm_timeout: "5s",
            tools_timeout: "5s",
            local_namespaces: None,
            workspace_url: Some("https://workspace.example"),
        }
    }

    pub fn without_health(mut self) -> Self {
        self.health = false;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: &'static str) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_local_namespaces(mut self, namespaces: &[&'static str]) -> Self {
        self.local_namespaces = Some(namespaces.to_vec());
        self
    }

    pub fn without_workspace(mut self) -> Self {
        self.workspace_url = None;
        self
    }

    pub fn to_toml(&self) -> String {
        let mut toml = format!(
            r#"
[server.health]
enabled = {health}

[llm]
timeout = "{llm_timeout}"

[llm.bedrock]
region = "us-east-1"

[tools]
timeout = "{tools_timeout}"
"#,
            health = self.health,
            llm_timeout = self.llm_timeout,
            tools_timeout = self.tools_timeout,
        );

        if let Some(namespaces) = &self.local_namespaces {
            let list: Vec<String> = namespaces.iter().map(|n| format!("\"{n}\"")).collect();
            toml.push_str(&format!("local_namespaces = [{}]\n", list.join(", ")));
        }

        if let Some(url) = self.workspace_url {
            toml.push_str(&format!("\n[tools.databricks]\nworkspace_url = \"{url}\"\n"));
        }

        toml
    }

    pub fn build(self) -> Config {
        Config::parse(&self.to_toml()).expect("test config should parse")
    }
}
