// ABOUTME: Selector: applies --only / --exclude name filters to the registry.
// ABOUTME: Keeps registry order; exclusion always wins; unknown names only warn.

use crate::registry::{Registry, ServerDescriptor};
use std::collections::HashSet;
use tracing::warn;

/// Name filters for one run. `None` for `only` means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub only: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Apply the filters, returning the working set in registry order.
    pub fn apply(&self, registry: &Registry) -> Vec<ServerDescriptor> {
        let only: Option<HashSet<&str>> = self
            .only
            .as_ref()
            .map(|names| names.iter().map(|n| n.trim()).collect());
        let exclude: HashSet<&str> = self.exclude.iter().map(|n| n.trim()).collect();

        let known: HashSet<&str> = registry.servers().iter().map(|s| s.name.as_str()).collect();
        for name in only.iter().flatten().chain(exclude.iter()) {
            if !name.is_empty() && !known.contains(name) {
                warn!(server = %name, "Filter names a server that is not in the registry");
            }
        }

        registry
            .servers()
            .iter()
            .filter(|s| only.as_ref().map_or(true, |o| o.contains(s.name.as_str())))
            .filter(|s| !exclude.contains(s.name.as_str()))
            .cloned()
            .collect()
    }
}
