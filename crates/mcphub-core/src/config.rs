// ABOUTME: Hub configuration built once at startup from an environment snapshot.
// ABOUTME: Holds ports, hosts, timing, the adapter invocation contract and settings output.

use crate::env::EnvSnapshot;
use crate::error::{HubError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_VAR: &str = "MCP_HUB_HOST";
pub const BASE_PORT_VAR: &str = "MCP_HUB_BASE_PORT";
pub const PUBLIC_HOST_VAR: &str = "MCP_HUB_PUBLIC_HOST";
pub const STARTUP_TIMEOUT_VAR: &str = "MCP_HUB_STARTUP_TIMEOUT_MS";
pub const BATCH_SIZE_VAR: &str = "MCP_HUB_BATCH_SIZE";
pub const ADAPTER_VAR: &str = "MCP_HUB_ADAPTER";
pub const SETTINGS_PATH_VAR: &str = "MCP_HUB_SETTINGS_PATH";
pub const SETTINGS_STYLE_VAR: &str = "MCP_HUB_SETTINGS_STYLE";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_BASE_PORT: u16 = 3001;
pub const DEFAULT_PUBLIC_HOST: &str = "localhost";
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_ADAPTER: &str = "npx -y supergateway";
pub const DEFAULT_SETTINGS_PATH: &str = "mcp_settings.json";

/// Transport the adapter exposes each server over.
pub const OUTPUT_TRANSPORT: &str = "streamableHttp";
/// Path the adapter mounts the protocol endpoint on.
pub const MOUNT_PATH: &str = "/mcp";
/// Path the adapter answers health checks on.
pub const HEALTH_PATH: &str = "/healthz";

/// Shape of each entry in the settings artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SettingsStyle {
    /// `{ "url": ... }`
    #[default]
    Url,
    /// `{ "type": "http", "url": ... }`
    Typed,
}

impl FromStr for SettingsStyle {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(SettingsStyle::Url),
            "typed" | "http" => Ok(SettingsStyle::Typed),
            other => Err(HubError::invalid(
                SETTINGS_STYLE_VAR,
                other,
                "expected 'url' or 'typed'",
            )),
        }
    }
}

/// The protocol-bridging adapter binary and the arguments that precede the
/// per-server flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl AdapterConfig {
    /// Parse an adapter command line such as `npx -y supergateway`.
    pub fn parse(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| HubError::invalid(ADAPTER_VAR, cmd, "adapter command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Everything the loader, launcher and settings generator read, in one place.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Host the adapters bind on; passed to each adapter as `HOST`.
    pub host: String,
    pub base_port: u16,
    /// Host used when building endpoint URLs for clients.
    pub public_host: String,
    /// How long a child must stay alive to count as running.
    pub startup_timeout: Duration,
    pub batch_size: usize,
    pub adapter: AdapterConfig,
    pub settings_path: PathBuf,
    pub settings_style: SettingsStyle,
    /// Base environment every child inherits.
    pub env: EnvSnapshot,
}

impl HubConfig {
    /// Build the configuration from an environment snapshot, applying
    /// defaults for anything unset or empty.
    pub fn from_env(env: EnvSnapshot) -> Result<Self> {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let base_port = match get(BASE_PORT_VAR) {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| HubError::invalid(BASE_PORT_VAR, v, e.to_string()))?,
            None => DEFAULT_BASE_PORT,
        };

        let startup_timeout = match get(STARTUP_TIMEOUT_VAR) {
            Some(v) => Duration::from_millis(
                v.parse::<u64>()
                    .map_err(|e| HubError::invalid(STARTUP_TIMEOUT_VAR, v, e.to_string()))?,
            ),
            None => DEFAULT_STARTUP_TIMEOUT,
        };

        let batch_size = match get(BATCH_SIZE_VAR) {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| HubError::invalid(BATCH_SIZE_VAR, v, e.to_string()))?,
            None => DEFAULT_BATCH_SIZE,
        };

        let adapter = AdapterConfig::parse(get(ADAPTER_VAR).unwrap_or(DEFAULT_ADAPTER))?;

        let settings_style = match get(SETTINGS_STYLE_VAR) {
            Some(v) => v.parse()?,
            None => SettingsStyle::default(),
        };

        let config = Self {
            host: get(HOST_VAR).unwrap_or(DEFAULT_HOST).to_string(),
            base_port,
            public_host: get(PUBLIC_HOST_VAR)
                .unwrap_or(DEFAULT_PUBLIC_HOST)
                .to_string(),
            startup_timeout,
            batch_size,
            adapter,
            settings_path: PathBuf::from(get(SETTINGS_PATH_VAR).unwrap_or(DEFAULT_SETTINGS_PATH)),
            settings_style,
            env,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the launcher relies on.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HubError::invalid(BATCH_SIZE_VAR, "0", "must be at least 1"));
        }
        Ok(())
    }
}
