#![allow(clippy::must_use_candidate)]

mod duration;
mod env;
pub mod llm;
mod loader;
pub mod server;
pub mod telemetry;
pub mod tools;

use serde::Deserialize;

pub use llm::*;
pub use server::*;
pub use telemetry::*;
pub use tools::*;

/// Top-level relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Model backend configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Server-side tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
