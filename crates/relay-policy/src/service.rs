use http::HeaderName;

/// Downstream services a tenant policy can enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {
    Databricks,
    Snowflake,
}

/// Identity field carried in the enablement header
pub(crate) struct FieldSpec {
    pub name: &'static str,
    /// Accepted keys, lowercase, first match wins
    pub keys: &'static [&'static str],
    pub required: bool,
}

/// Resource header feeding a named allowlist
pub(crate) struct AllowlistSpec {
    pub name: &'static str,
    pub header: HeaderName,
}

impl ServiceKind {
    pub const ALL: [Self; 2] = [Self::Databricks, Self::Snowflake];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Databricks => "databricks",
            Self::Snowflake => "snowflake",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub(crate) const fn enablement_header(self) -> HeaderName {
        match self {
            Self::Databricks => HeaderName::from_static("x-enable-databricks"),
            Self::Snowflake => HeaderName::from_static("x-enable-snowflake"),
        }
    }

    pub(crate) fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Databricks => &[FieldSpec {
                name: "workspace_url",
                keys: &["workspace_url", "workspace"],
                required: false,
            }],
            Self::Snowflake => &[
                FieldSpec {
                    name: "account",
                    keys: &["account"],
                    required: true,
                },
                FieldSpec {
                    name: "user",
                    keys: &["user"],
                    required: true,
                },
            ],
        }
    }

    pub(crate) fn allowlists(self) -> Vec<AllowlistSpec> {
        match self {
            Self::Databricks => vec![AllowlistSpec {
                name: "spaces",
                header: HeaderName::from_static("x-enable-databricks-space"),
            }],
            Self::Snowflake => vec![
                AllowlistSpec {
                    name: "clusters",
                    header: HeaderName::from_static("x-enable-snowflake-cluster"),
                },
                AllowlistSpec {
                    name: "databases",
                    header: HeaderName::from_static("x-enable-snowflake-database"),
                },
            ],
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
