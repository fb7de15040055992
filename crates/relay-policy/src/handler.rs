//! `GET /policy`: the derived policy as the caller sent it, minus tokens

use std::collections::BTreeMap;

use axum::{Json, Router, routing};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::policy::{ServiceSubPolicy, TenantPolicy};
use crate::service::ServiceKind;

/// Router serving the policy introspection endpoint
pub fn policy_router() -> Router {
    Router::new().route("/policy", routing::get(describe_policy))
}

async fn describe_policy(policy: TenantPolicy) -> Json<PolicySummary> {
    Json(PolicySummary::from(&policy))
}

/// Serializable view of a [`TenantPolicy`]
///
/// Every known service appears, as `null` when its enablement header was
/// absent.
#[derive(Debug, Serialize)]
pub struct PolicySummary {
    enabled_services: Vec<&'static str>,
    #[serde(flatten)]
    services: BTreeMap<&'static str, Option<ServiceSummary>>,
}

#[derive(Debug, Serialize)]
struct ServiceSummary {
    enabled: bool,
    #[serde(flatten)]
    fields: BTreeMap<&'static str, Option<String>>,
    #[serde(flatten)]
    allowlists: BTreeMap<&'static str, Vec<String>>,
    has_token: bool,
}

impl ServiceSummary {
    fn new(kind: ServiceKind, sub: &ServiceSubPolicy) -> Self {
        Self {
            enabled: sub.is_enabled(),
            fields: kind
                .fields()
                .iter()
                .map(|spec| (spec.name, sub.field(spec.name).map(str::to_owned)))
                .collect(),
            allowlists: kind
                .allowlists()
                .iter()
                .map(|spec| (spec.name, sub.allowlist(spec.name).map(str::to_owned).collect()))
                .collect(),
            has_token: !sub.token().expose_secret().is_empty(),
        }
    }
}

impl From<&TenantPolicy> for PolicySummary {
    fn from(policy: &TenantPolicy) -> Self {
        Self {
            enabled_services: policy.enabled_services().into_iter().map(ServiceKind::name).collect(),
            services: ServiceKind::ALL
                .into_iter()
                .map(|kind| (kind.name(), policy.service(kind).map(|sub| ServiceSummary::new(kind, sub))))
                .collect(),
        }
    }
}
