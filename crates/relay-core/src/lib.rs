//! Types shared by every relay crate: the per-request context, the
//! HTTP error contract, and header helpers.

#![allow(clippy::must_use_candidate)]

mod context;
mod error;
pub mod headers;

pub use context::RequestContext;
pub use error::{HttpError, error_body};
