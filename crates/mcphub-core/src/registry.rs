// ABOUTME: Server registry: the static list of server descriptors the hub can launch.
// ABOUTME: Loaded from a TOML table of [[servers]] and validated before any launch.

use crate::env::EnvSnapshot;
use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_REGISTRY_PATH: &str = "servers.toml";

/// Static definition of one launchable stdio server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique name; used for ports, filters and settings keys.
    pub name: String,
    /// Executable name or path.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides. Values may reference `${VAR}` from the hub
    /// environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The full command line as a single space-joined string, which is how
    /// the adapter receives it.
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolve the env overrides against `base`. Entries whose value is
    /// empty, or references an unset variable, are left out so the child
    /// keeps whatever the base environment holds.
    pub fn resolved_env(&self, base: &EnvSnapshot) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        for (key, raw) in &self.env {
            let mut missing = false;
            let value = shellexpand::env_with_context_no_errors(raw, |var: &str| {
                match base.get(var).filter(|v| !v.is_empty()) {
                    Some(v) => Some(v.clone()),
                    None => {
                        missing = true;
                        Some(String::new())
                    }
                }
            });

            if missing || value.is_empty() {
                debug!(server = %self.name, key = %key, "Omitting unset env override");
                continue;
            }
            resolved.insert(key.clone(), value.into_owned());
        }
        resolved
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    servers: Vec<ServerDescriptor>,
}

/// Ordered list of descriptors. Order determines port assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    servers: Vec<ServerDescriptor>,
}

impl Registry {
    /// Build a registry, rejecting empty fields and duplicate names.
    pub fn new(servers: Vec<ServerDescriptor>) -> Result<Self> {
        validate(&servers)?;
        Ok(Self { servers })
    }

    /// Load a registry from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HubError::io(path, e))?;
        Self::from_toml(&content).map_err(|e| match e {
            HubError::RegistryParse { source, .. } => HubError::RegistryParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse a registry from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|source| HubError::RegistryParse {
                path: Default::default(),
                source,
            })?;
        Self::new(file.servers)
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

fn validate(servers: &[ServerDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, server) in servers.iter().enumerate() {
        if server.name.trim().is_empty() {
            return Err(HubError::EmptyField {
                index,
                field: "name",
            });
        }
        if server.command.trim().is_empty() {
            return Err(HubError::EmptyField {
                index,
                field: "command",
            });
        }
        if !seen.insert(server.name.as_str()) {
            return Err(HubError::DuplicateServer(server.name.clone()));
        }
    }
    Ok(())
}
