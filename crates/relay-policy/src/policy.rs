use std::collections::{BTreeMap, BTreeSet};

use http::{HeaderMap, HeaderName};
use relay_core::headers::{header_list, header_text};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{PolicyValidationError, UnauthorizedOperation};
use crate::header::{parse_flag, parse_pairs};
use crate::service::ServiceKind;

/// A resource identifier a call wants to touch, checked against the named
/// allowlist of the target service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef<'a> {
    pub allowlist: &'static str,
    pub id: &'a str,
}

impl<'a> ResourceRef<'a> {
    pub const fn new(allowlist: &'static str, id: &'a str) -> Self {
        Self { allowlist, id }
    }
}

/// One service's slice of a [`TenantPolicy`]
#[derive(Debug)]
pub struct ServiceSubPolicy {
    token: SecretString,
    enabled: bool,
    fields: BTreeMap<&'static str, String>,
    allowlists: BTreeMap<&'static str, BTreeSet<String>>,
}

impl ServiceSubPolicy {
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Identity field such as `account`, `user` or `workspace_url`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Entries of a named allowlist, sorted
    pub fn allowlist(&self, name: &str) -> impl Iterator<Item = &str> {
        self.allowlists.get(name).into_iter().flatten().map(String::as_str)
    }

    pub fn allows(&self, allowlist: &str, id: &str) -> bool {
        self.allowlists.get(allowlist).is_some_and(|list| list.contains(id))
    }

    fn from_headers(kind: ServiceKind, headers: &HeaderMap) -> Result<Option<Self>, PolicyValidationError> {
        let enablement = kind.enablement_header();
        let invalid = |name: &HeaderName| PolicyValidationError::InvalidHeader {
            header: name.as_str().to_owned(),
        };

        let Some(raw) = header_text(headers, &enablement).map_err(|_| invalid(&enablement))? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let mut pairs = parse_pairs(raw);
        let token = pairs.remove("token").unwrap_or_default();

        // Unrecognised or empty spellings switch the service off
        let enabled = match pairs.get("enabled") {
            Some(value) => parse_flag(value).unwrap_or(false),
            None => !token.is_empty(),
        };

        if enabled && token.is_empty() {
            return Err(PolicyValidationError::MissingToken { service: kind.name() });
        }

        let mut fields = BTreeMap::new();
        for spec in kind.fields() {
            let value = spec
                .keys
                .iter()
                .find_map(|key| pairs.get(*key).filter(|v| !v.is_empty()));

            match value {
                Some(value) => {
                    fields.insert(spec.name, value.clone());
                }
                None if enabled && spec.required => {
                    return Err(PolicyValidationError::MissingField {
                        service: kind.name(),
                        field: spec.name,
                    });
                }
                None => {}
            }
        }

        let mut allowlists = BTreeMap::new();
        for spec in kind.allowlists() {
            let entries = header_list(headers, &spec.header).map_err(|_| invalid(&spec.header))?;
            allowlists.insert(spec.name, entries.into_iter().collect());
        }

        Ok(Some(Self {
            token: SecretString::from(token),
            enabled,
            fields,
            allowlists,
        }))
    }
}

/// Immutable per-request authorization snapshot
///
/// Built fresh from every request's headers and dropped with it. Not
/// `Clone`: a policy belongs to exactly one request.
#[derive(Debug, Default)]
pub struct TenantPolicy {
    services: BTreeMap<ServiceKind, ServiceSubPolicy>,
}

impl TenantPolicy {
    /// Derive the policy for one request
    ///
    /// A service whose enablement header is absent has no sub-policy at all.
    ///
    /// # Errors
    ///
    /// Fails when an enabled service lacks its token or a required field,
    /// or when a policy header is not visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, PolicyValidationError> {
        let mut services = BTreeMap::new();

        for kind in ServiceKind::ALL {
            if let Some(sub) = ServiceSubPolicy::from_headers(kind, headers)? {
                services.insert(kind, sub);
            }
        }

        let policy = Self { services };
        tracing::debug!(enabled = ?policy.enabled_services(), "derived tenant policy");
        Ok(policy)
    }

    pub fn service(&self, kind: ServiceKind) -> Option<&ServiceSubPolicy> {
        self.services.get(&kind)
    }

    /// Services with a present and enabled sub-policy, in declaration order
    pub fn enabled_services(&self) -> Vec<ServiceKind> {
        self.services
            .iter()
            .filter(|(_, sub)| sub.enabled)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn is_service_enabled(&self, service: &str) -> bool {
        ServiceKind::from_name(service)
            .and_then(|kind| self.service(kind))
            .is_some_and(ServiceSubPolicy::is_enabled)
    }

    /// Token for a service whose sub-policy is present
    pub fn get_service_token(&self, service: &str) -> Option<&SecretString> {
        ServiceKind::from_name(service)
            .and_then(|kind| self.service(kind))
            .map(ServiceSubPolicy::token)
            .filter(|token| !token.expose_secret().is_empty())
    }

    /// Whether `service.operation` touching `resources` is allowed
    pub fn validate_operation(&self, service: &str, operation: &str, resources: &[ResourceRef<'_>]) -> bool {
        self.authorize(service, operation, resources).is_ok()
    }

    /// Check `service.operation` touching `resources`
    ///
    /// Every resource must appear in its allowlist, so an empty allowlist
    /// denies every resource-scoped operation.
    ///
    /// # Errors
    ///
    /// Returns [`UnauthorizedOperation`] describing the first failed check.
    pub fn authorize(
        &self,
        service: &str,
        operation: &str,
        resources: &[ResourceRef<'_>],
    ) -> Result<(), UnauthorizedOperation> {
        let deny = |details: String| UnauthorizedOperation::new(service, operation, details);

        let Some(kind) = ServiceKind::from_name(service) else {
            return Err(deny(format!("unknown service '{service}'")));
        };
        let Some(sub) = self.service(kind) else {
            return Err(deny(format!("{service} is not configured for this request")));
        };
        if !sub.enabled {
            return Err(deny(format!("{service} is disabled for this request")));
        }

        for resource in resources {
            if !sub.allows(resource.allowlist, resource.id) {
                return Err(deny(format!(
                    "'{}' is not in the allowed {}",
                    resource.id, resource.allowlist
                )));
            }
        }

        Ok(())
    }
}
