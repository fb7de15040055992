//! Test server wrapper that starts relay on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use relay_config::Config;
use relay_llm::{Gateway, ModelCatalog, ToolRouting};
use relay_tools::{Downstream, Toolbelt};
use tokio_util::sync::CancellationToken;

use super::backend::ScriptedBackend;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server wired to in-process fakes
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config, backend: Arc<ScriptedBackend>, downstream: Downstream) -> anyhow::Result<Self> {
        let toolbelt = Toolbelt::new(relay_tools::capabilities::builtin(), downstream, &config.tools);
        let routing = match &config.tools.local_namespaces {
            Some(namespaces) => ToolRouting::new(namespaces.iter().cloned()),
            None => ToolRouting::new(toolbelt.registry().namespaces()),
        };
        let gateway = Gateway::new(
            ModelCatalog::from_config(&config.llm),
            backend,
            routing,
            config.llm.timeout,
        );
        let router = relay_server::router(&config.server, gateway, toolbelt);

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Parse SSE `data:` payloads from raw response text
pub fn parse_sse_data(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("data: "))
        .map(|line| line.trim_start_matches("data: ").to_owned())
        .collect()
}
