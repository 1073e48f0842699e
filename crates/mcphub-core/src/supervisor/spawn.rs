// ABOUTME: Builds and spawns the adapter process for one launch plan.
// ABOUTME: Forwards child output to the log and keeps a bounded stderr tail for error messages.

use super::plan::LaunchPlan;
use crate::config::{HubConfig, HEALTH_PATH, OUTPUT_TRANSPORT};
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Stderr lines kept per child.
const STDERR_TAIL_CAPACITY: usize = 20;
/// Stderr lines quoted in failure messages.
const STDERR_EXCERPT_LINES: usize = 5;
/// How long to wait for buffered stderr after a child exits.
pub(crate) const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Build the adapter invocation for `plan`: the adapter's own arguments,
/// then the wrapped command line and the per-server flags. The child
/// inherits the full process environment, with the snapshot, `HOST` and
/// the descriptor's overrides layered on top in that order.
pub(crate) fn adapter_command(config: &HubConfig, plan: &LaunchPlan) -> Command {
    let mut cmd = Command::new(&config.adapter.program);
    cmd.args(&config.adapter.args)
        .arg("--stdio")
        .arg(plan.server.command_line())
        .arg("--outputTransport")
        .arg(OUTPUT_TRANSPORT)
        .arg("--port")
        .arg(plan.port.to_string())
        .arg("--cors")
        .arg("--logLevel")
        .arg("none")
        .arg("--healthEndpoint")
        .arg(HEALTH_PATH)
        .envs(&config.env)
        .env("HOST", &config.host)
        .envs(plan.server.resolved_env(&config.env))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Rolling buffer of a child's most recent stderr lines.
#[derive(Debug, Clone, Default)]
pub(crate) struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl StderrTail {
    async fn push(&self, line: String) {
        let mut lines = self.lines.lock().await;
        if lines.len() == STDERR_TAIL_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// The last few non-empty lines, oldest first.
    pub(crate) async fn excerpt(&self) -> Vec<String> {
        let lines = self.lines.lock().await;
        let mut excerpt: Vec<String> = lines
            .iter()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .take(STDERR_EXCERPT_LINES)
            .cloned()
            .collect();
        excerpt.reverse();
        excerpt
    }
}

/// Spawn tasks that drain the child's stdout and stderr for its whole
/// lifetime. Returns the stderr task so callers can wait for it to flush.
pub(crate) fn forward_output(
    name: &str,
    child: &mut Child,
    tail: StderrTail,
) -> Option<JoinHandle<()>> {
    if let Some(stdout) = child.stdout.take() {
        let server = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(server = %server, stream = "stdout", "{}", line);
            }
        });
    }

    child.stderr.take().map(|stderr| {
        let server = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(server = %server, stream = "stderr", "{}", line);
                tail.push(line).await;
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::env::EnvSnapshot;
    use crate::registry::ServerDescriptor;

    #[tokio::test]
    async fn test_tail_keeps_most_recent_lines() {
        let tail = StderrTail::default();
        for i in 0..30 {
            tail.push(format!("line {i}")).await;
        }
        tail.push("   ".to_string()).await;

        let excerpt = tail.excerpt().await;
        assert_eq!(
            excerpt,
            vec!["line 25", "line 26", "line 27", "line 28", "line 29"]
        );
        assert_eq!(tail.lines.lock().await.len(), STDERR_TAIL_CAPACITY);
    }

    #[test]
    fn test_adapter_command_follows_invocation_contract() {
        let mut config = crate::config::HubConfig::from_env(EnvSnapshot::new()).unwrap();
        config.adapter = AdapterConfig::parse("npx -y supergateway").unwrap();
        let plan = LaunchPlan {
            server: ServerDescriptor::new("memory", "npx")
                .with_args(["-y", "@modelcontextprotocol/server-memory"]),
            port: 3005,
        };

        let cmd = adapter_command(&config, &plan);
        let std_cmd = cmd.as_std();
        let args: Vec<String> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(std_cmd.get_program(), "npx");
        assert_eq!(
            args,
            vec![
                "-y",
                "supergateway",
                "--stdio",
                "npx -y @modelcontextprotocol/server-memory",
                "--outputTransport",
                "streamableHttp",
                "--port",
                "3005",
                "--cors",
                "--logLevel",
                "none",
                "--healthEndpoint",
                "/healthz",
            ]
        );
    }

    #[test]
    fn test_adapter_command_overlays_descriptor_env() {
        let mut env = EnvSnapshot::new();
        env.insert("GITHUB_TOKEN".to_string(), "ghp_abc".to_string());
        env.insert("SHARED".to_string(), "base".to_string());
        let config = crate::config::HubConfig::from_env(env).unwrap();
        let plan = LaunchPlan {
            server: ServerDescriptor::new("github", "npx")
                .with_env("GITHUB_PERSONAL_ACCESS_TOKEN", "${GITHUB_TOKEN}")
                .with_env("SHARED", "override")
                .with_env("UNSET", "${NOT_PRESENT}"),
            port: 3001,
        };

        let cmd = adapter_command(&config, &plan);
        let envs: std::collections::HashMap<String, Option<String>> = cmd
            .as_std()
            .get_envs()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.map(|v| v.to_string_lossy().into_owned()),
                )
            })
            .collect();

        assert_eq!(
            envs.get("GITHUB_PERSONAL_ACCESS_TOKEN"),
            Some(&Some("ghp_abc".to_string()))
        );
        assert_eq!(envs.get("SHARED"), Some(&Some("override".to_string())));
        assert_eq!(envs.get("HOST"), Some(&Some("0.0.0.0".to_string())));
        assert!(!envs.contains_key("UNSET"));
    }
}
