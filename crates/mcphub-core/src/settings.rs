// ABOUTME: Settings generator: maps server names to reachable endpoint URLs.
// ABOUTME: Writes the mcpServers JSON document a downstream client reads, replacing any previous file.

use crate::config::{HubConfig, SettingsStyle, MOUNT_PATH};
use crate::error::{HubError, Result};
use crate::report::RunReport;
use crate::supervisor::LaunchPlan;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use url::Url;

/// Endpoint entry for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    pub url: String,
}

/// The generated settings artifact. Keys are sorted so regeneration is
/// byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsDocument {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: BTreeMap<String, Endpoint>,
}

/// Endpoint URL a client uses to reach the adapter on `port`.
pub fn endpoint_url(public_host: &str, port: u16) -> Result<Url> {
    Url::parse(&format!("http://{public_host}:{port}{MOUNT_PATH}")).map_err(|source| {
        HubError::InvalidUrl {
            host: public_host.to_string(),
            source,
        }
    })
}

impl SettingsDocument {
    /// Build from the servers that came up, or, when nothing was launched,
    /// from every plan with its predicted port.
    pub fn build(config: &HubConfig, plans: &[LaunchPlan], report: Option<&RunReport>) -> Result<Self> {
        let entries: Vec<(&str, u16)> = match report {
            Some(report) => report.running().collect(),
            None => plans.iter().map(|p| (p.name(), p.port)).collect(),
        };

        let mut mcp_servers = BTreeMap::new();
        for (name, port) in entries {
            let url = endpoint_url(&config.public_host, port)?;
            let transport = match config.settings_style {
                SettingsStyle::Url => None,
                SettingsStyle::Typed => Some("http".to_string()),
            };
            mcp_servers.insert(
                name.to_string(),
                Endpoint {
                    transport,
                    url: url.into(),
                },
            );
        }
        Ok(Self { mcp_servers })
    }

    /// Pretty-printed JSON, without a trailing newline.
    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Overwrite `path` with this document.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = self.render()?;
        content.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HubError::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| HubError::io(path, e))?;

        info!(
            path = %path.display(),
            servers = self.mcp_servers.len(),
            "Wrote settings"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvSnapshot;
    use crate::registry::ServerDescriptor;
    use crate::supervisor::{plan_launches, LaunchOutcome};
    use insta::assert_snapshot;

    fn config(style: SettingsStyle) -> HubConfig {
        let mut config = HubConfig::from_env(EnvSnapshot::new()).unwrap();
        config.public_host = "192.168.1.20".to_string();
        config.settings_style = style;
        config
    }

    fn plans() -> Vec<LaunchPlan> {
        let servers = vec![
            ServerDescriptor::new("memory", "npx"),
            ServerDescriptor::new("github", "npx"),
            ServerDescriptor::new("fetch", "uvx"),
        ];
        plan_launches(&servers, 4000).unwrap()
    }

    fn report() -> RunReport {
        let mut report = RunReport::new(3);
        report.record(vec![
            LaunchOutcome::Failed {
                name: "memory".to_string(),
                error: "exited with code 0 before startup completed".to_string(),
            },
            LaunchOutcome::Running {
                name: "github".to_string(),
                port: 4001,
                pid: Some(1234),
            },
            LaunchOutcome::Failed {
                name: "fetch".to_string(),
                error: "exited with code 1 before startup completed".to_string(),
            },
        ]);
        report
    }

    #[test]
    fn test_only_running_servers_are_listed() {
        let doc = SettingsDocument::build(&config(SettingsStyle::Url), &plans(), Some(&report()))
            .unwrap();

        assert_eq!(doc.mcp_servers.len(), 1);
        assert_eq!(doc.mcp_servers["github"].url, "http://192.168.1.20:4001/mcp");
    }

    #[test]
    fn test_without_report_uses_predicted_ports() {
        let doc = SettingsDocument::build(&config(SettingsStyle::Url), &plans(), None).unwrap();

        assert_eq!(doc.mcp_servers.len(), 3);
        assert_eq!(doc.mcp_servers["memory"].url, "http://192.168.1.20:4000/mcp");
        assert_eq!(doc.mcp_servers["fetch"].url, "http://192.168.1.20:4002/mcp");
    }

    #[test]
    fn test_typed_style_document_shape() {
        let doc = SettingsDocument::build(&config(SettingsStyle::Typed), &plans(), None).unwrap();

        assert_snapshot!(doc.render().unwrap(), @r#"
{
  "mcpServers": {
    "fetch": {
      "type": "http",
      "url": "http://192.168.1.20:4002/mcp"
    },
    "github": {
      "type": "http",
      "url": "http://192.168.1.20:4001/mcp"
    },
    "memory": {
      "type": "http",
      "url": "http://192.168.1.20:4000/mcp"
    }
  }
}
"#);
    }

    #[test]
    fn test_url_style_omits_type() {
        let doc = SettingsDocument::build(&config(SettingsStyle::Url), &plans(), Some(&report()))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&doc.render().unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "mcpServers": {
                    "github": { "url": "http://192.168.1.20:4001/mcp" }
                }
            })
        );
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mcp_settings.json");
        let config = config(SettingsStyle::Url);

        SettingsDocument::build(&config, &plans(), Some(&report()))
            .unwrap()
            .write(&path)
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        SettingsDocument::build(&config, &plans(), Some(&report()))
            .unwrap()
            .write(&path)
            .unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with(b"}\n"));
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp_settings.json");
        std::fs::write(&path, "{\"mcpServers\":{\"stale\":{\"url\":\"x\"}},\"extra\":1}").unwrap();

        SettingsDocument::default().write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"mcpServers\": {}\n}\n");
    }

    #[test]
    fn test_invalid_public_host_is_an_error() {
        let err = endpoint_url("bad host", 4000).unwrap_err();
        assert!(matches!(err, HubError::InvalidUrl { .. }));
    }
}
