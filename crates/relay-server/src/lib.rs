mod health;
mod request_context;

use std::net::SocketAddr;

use axum::Router;
use relay_config::{Config, ServerConfig};
use relay_llm::{Gateway, ToolRouting};
use relay_tools::Toolbelt;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the downstream tool clients cannot be built
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

        let toolbelt = Toolbelt::from_config(&config.tools)?;

        let routing = match &config.tools.local_namespaces {
            Some(namespaces) => ToolRouting::new(namespaces.iter().cloned()),
            None => ToolRouting::new(toolbelt.registry().namespaces()),
        };
        tracing::info!(namespaces = ?routing.namespaces().collect::<Vec<_>>(), "local tool routing");

        let gateway = Gateway::from_config(&config.llm, routing).await;

        Ok(Self {
            router: router(&config.server, gateway, toolbelt),
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

/// Assemble routes and middleware around already-built subsystems
pub fn router(server: &ServerConfig, gateway: Gateway, toolbelt: Toolbelt) -> Router {
    let mut app = Router::new();

    if server.health.enabled {
        app = app.route(&server.health.path, axum::routing::get(health::health_handler));
    }

    app = app.merge(relay_llm::llm_router(gateway));
    app = app.merge(relay_tools::tools_router(toolbelt));
    app = app.merge(relay_policy::policy_router());

    // Request context (innermost, runs just before handlers)
    app = app.layer(axum::middleware::from_fn(request_context::request_context_middleware));

    app.layer(TraceLayer::new_for_http())
}
