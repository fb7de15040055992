//! Server-side capabilities and the gate that guards them
//!
//! Capabilities live in a [`Registry`] built at startup, grouped by service
//! namespace (`server`, `databricks`, `snowflake`). The [`Toolbelt`] resolves
//! a requested name, checks it against the request's
//! [`TenantPolicy`](relay_policy::TenantPolicy), injects the tenant's
//! credentials and dispatches. Every call ends in a [`ToolOutcome`]
//! envelope; nothing a capability does escapes as an error or panic.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod capabilities;
pub mod downstream;
pub mod error;
#[cfg(feature = "http")]
pub mod handler;
pub mod outcome;
pub mod registry;
pub mod toolbelt;

pub use downstream::{CortexApi, Downstream, GenieApi};
pub use error::ToolError;
#[cfg(feature = "http")]
pub use handler::tools_router;
pub use outcome::ToolOutcome;
pub use registry::{CapabilitySpec, Invocation, ParamKind, ParamSpec, Registry};
pub use toolbelt::Toolbelt;
