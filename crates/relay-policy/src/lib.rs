//! Per-request tenant policy derived from headers
//!
//! Each downstream service is enabled by one header of `key=value` pairs,
//! with repeatable resource headers listing what the tenant may touch:
//!
//! ```text
//! X-Enable-Databricks: Token=dapi-123; Workspace_Url=https://example.cloud.databricks.com
//! X-Enable-Databricks-Space: space1, space2
//! X-Enable-Snowflake: Token=snow-123; Account=acme; User=analyst
//! X-Enable-Snowflake-Database: SALES
//! ```
//!
//! The resulting [`TenantPolicy`] is built once per request and is never
//! shared or mutated. Header content is trusted as-is; this is an
//! authorization shape, not authentication.

#![allow(clippy::must_use_candidate)]

mod error;
#[cfg(feature = "http")]
mod extract;
#[cfg(feature = "http")]
mod handler;
mod header;
mod policy;
mod service;

pub use error::{PolicyValidationError, UnauthorizedOperation};
#[cfg(feature = "http")]
pub use handler::{PolicySummary, policy_router};
pub use policy::{ResourceRef, ServiceSubPolicy, TenantPolicy};
pub use service::ServiceKind;
