use std::collections::BTreeSet;

/// Decides whether a tool call is executed by this server or forwarded
///
/// A call is local when its name is qualified with a local namespace,
/// either dotted (`databricks.list_spaces`) or in the legacy underscore
/// form (`databricks_list_spaces`). Bare and foreign names are forwarded.
#[derive(Debug, Clone, Default)]
pub struct ToolRouting {
    namespaces: BTreeSet<String>,
}

impl ToolRouting {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Local namespace the name is qualified with, if any
    pub fn local_namespace<'a>(&'a self, name: &str) -> Option<&'a str> {
        if let Some((namespace, capability)) = name.split_once('.') {
            return self
                .namespaces
                .get(namespace)
                .filter(|_| !capability.is_empty())
                .map(String::as_str);
        }

        self.namespaces
            .iter()
            .find(|ns| {
                name.strip_prefix(ns.as_str())
                    .and_then(|rest| rest.strip_prefix('_'))
                    .is_some_and(|capability| !capability.is_empty())
            })
            .map(String::as_str)
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local_namespace(name).is_some()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}
