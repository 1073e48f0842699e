// ABOUTME: Error types for the mcphub core library.
// ABOUTME: Configuration and I/O failures that abort a run before or after launching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run. Per-server launch failures are never raised as
/// errors; they are recorded as `LaunchOutcome::Failed`.
#[derive(Error, Debug)]
pub enum HubError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server registry file is not valid TOML or has the wrong shape.
    #[error("failed to parse registry {}: {source}", path.display())]
    RegistryParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Two descriptors share a name.
    #[error("duplicate server name '{0}' in registry")]
    DuplicateServer(String),

    /// A descriptor is missing a required field.
    #[error("server #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    /// A configuration value could not be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// The public host does not form a valid endpoint URL.
    #[error("invalid public endpoint for host '{host}': {source}")]
    InvalidUrl {
        host: String,
        #[source]
        source: url::ParseError,
    },

    /// The settings document could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl HubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HubError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        HubError::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
