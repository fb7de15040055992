use serde_json::json;

use super::payload;
use crate::registry::{CapabilityResult, CapabilitySpec, Invocation, Registry};

pub(super) fn register(registry: &mut Registry) {
    registry.register(CapabilitySpec::new(
        "server",
        "get_status",
        "Report which services this request has enabled",
        get_status,
    ));
}

async fn get_status(invocation: Invocation) -> CapabilityResult {
    let services: Vec<&str> = invocation.enabled_services.iter().map(|s| s.name()).collect();

    Ok(payload(json!({
        "status": "ok",
        "enabled_services": services,
        "capabilities": invocation.capability_count,
    })))
}
