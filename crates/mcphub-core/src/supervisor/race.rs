// ABOUTME: Startup race state machine: Pending resolves exactly once to Running or Failed.
// ABOUTME: Events after resolution are reported as late failures instead of transitions.

use super::plan::LaunchPlan;
use std::fmt;
use std::process::ExitStatus;

/// Terminal classification for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Running {
        name: String,
        port: u16,
        pid: Option<u32>,
    },
    Failed {
        name: String,
        error: String,
    },
}

impl LaunchOutcome {
    pub fn name(&self) -> &str {
        match self {
            LaunchOutcome::Running { name, .. } | LaunchOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, LaunchOutcome::Running { .. })
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Code(i32),
    Signal(i32),
    Unknown,
}

impl From<ExitStatus> for ExitKind {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitKind::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitKind::Signal(signal);
            }
        }
        ExitKind::Unknown
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "exited with code {code}"),
            ExitKind::Signal(signal) => write!(f, "was killed by signal {signal}"),
            ExitKind::Unknown => write!(f, "exited"),
        }
    }
}

/// The three things that can happen to a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    /// The adapter could not be started or waited on.
    SpawnError(String),
    /// The adapter process ended, with the tail of its stderr.
    Exited {
        exit: ExitKind,
        stderr_tail: Vec<String>,
    },
    /// The startup timeout elapsed with the process still alive.
    TimerElapsed { pid: Option<u32> },
}

/// A launch that has not resolved yet. Resolving consumes it, so a launch
/// can only ever leave `Pending` once.
#[derive(Debug)]
pub struct PendingLaunch {
    name: String,
    port: u16,
}

impl PendingLaunch {
    pub fn new(plan: &LaunchPlan) -> Self {
        Self {
            name: plan.server.name.clone(),
            port: plan.port,
        }
    }

    /// Classify the first event. Any exit before the timeout is a failure,
    /// including a clean exit with code 0: a server that exits immediately
    /// never started serving.
    pub fn resolve(self, event: LaunchEvent) -> ResolvedLaunch {
        let outcome = match event {
            LaunchEvent::SpawnError(error) => LaunchOutcome::Failed {
                name: self.name,
                error: format!("failed to start adapter: {error}"),
            },
            LaunchEvent::Exited { exit, stderr_tail } => LaunchOutcome::Failed {
                name: self.name,
                error: with_tail(format!("{exit} before startup completed"), &stderr_tail),
            },
            LaunchEvent::TimerElapsed { pid } => LaunchOutcome::Running {
                name: self.name,
                port: self.port,
                pid,
            },
        };
        ResolvedLaunch { outcome }
    }
}

/// A launch whose outcome is fixed.
#[derive(Debug, Clone)]
pub struct ResolvedLaunch {
    outcome: LaunchOutcome,
}

impl ResolvedLaunch {
    pub fn outcome(&self) -> &LaunchOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> LaunchOutcome {
        self.outcome
    }

    /// Route an event that arrived after resolution. Only the exit of a
    /// server recorded as running is worth reporting; it never changes the
    /// recorded outcome.
    pub fn late_event(&self, event: LaunchEvent) -> Option<LateFailure> {
        let LaunchOutcome::Running { name, port, pid } = &self.outcome else {
            return None;
        };
        let message = match event {
            LaunchEvent::Exited { exit, stderr_tail } => with_tail(exit.to_string(), &stderr_tail),
            LaunchEvent::SpawnError(error) => error,
            LaunchEvent::TimerElapsed { .. } => return None,
        };
        Some(LateFailure {
            name: name.clone(),
            port: *port,
            pid: *pid,
            message,
        })
    }
}

/// A server that died after it was recorded as running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateFailure {
    pub name: String,
    pub port: u16,
    pub pid: Option<u32>,
    pub message: String,
}

fn with_tail(message: String, stderr_tail: &[String]) -> String {
    if stderr_tail.is_empty() {
        message
    } else {
        format!("{message}; stderr: {}", stderr_tail.join(" | "))
    }
}
