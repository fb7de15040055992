use std::path::PathBuf;

use clap::Parser;

/// Relay chat gateway
#[derive(Debug, Parser)]
#[command(name = "relay", about = "OpenAI-compatible chat gateway for AWS Bedrock with policy-gated tools")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "RELAY_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
