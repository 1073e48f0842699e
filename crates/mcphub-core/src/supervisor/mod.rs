// ABOUTME: Launcher/supervisor: spawns adapters in fixed-size batches and races each startup.
// ABOUTME: "Still alive after the startup timeout" is the readiness heuristic; there is no health probe.

pub mod plan;
pub mod race;
mod spawn;

pub use plan::{plan_launches, LaunchPlan};
pub use race::{
    ExitKind, LateFailure, LaunchEvent, LaunchOutcome, PendingLaunch, ResolvedLaunch,
};

use crate::config::HubConfig;
use crate::report::{Reporter, RunReport};
use futures::future::join_all;
use spawn::{StderrTail, STDERR_DRAIN_TIMEOUT};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives launches for one run. Owns each child only until its startup
/// race resolves; running children are then watched solely to report
/// late exits.
pub struct Supervisor {
    config: HubConfig,
    late_tx: mpsc::UnboundedSender<LateFailure>,
}

impl Supervisor {
    /// Create a supervisor and the receiving end of its late-failure channel.
    pub fn new(config: HubConfig) -> (Self, mpsc::UnboundedReceiver<LateFailure>) {
        let (late_tx, late_rx) = mpsc::unbounded_channel();
        (Self { config, late_tx }, late_rx)
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Launch every plan, one batch at a time. All launches in a batch run
    /// concurrently and the next batch starts only after each has resolved.
    pub async fn run(&self, plans: &[LaunchPlan], reporter: &mut dyn Reporter) -> RunReport {
        let batches: Vec<&[LaunchPlan]> = plans.chunks(self.config.batch_size.max(1)).collect();
        let total = batches.len();
        let mut report = RunReport::new(plans.len());

        info!(
            servers = plans.len(),
            batches = total,
            timeout = ?self.config.startup_timeout,
            "Launching servers"
        );

        for (index, batch) in batches.into_iter().enumerate() {
            let number = index + 1;
            reporter.batch_started(number, total, batch);

            let outcomes = join_all(batch.iter().map(|plan| self.launch(plan))).await;

            reporter.batch_finished(number, total, batch, &outcomes);
            report.record(outcomes);
        }

        reporter.summary(&report);
        report
    }

    /// Race one adapter's startup against the timeout and classify it.
    pub async fn launch(&self, plan: &LaunchPlan) -> LaunchOutcome {
        let pending = PendingLaunch::new(plan);
        let name = plan.name();

        let mut child = match spawn::adapter_command(&self.config, plan).spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(server = %name, error = %e, "Adapter failed to spawn");
                return pending
                    .resolve(LaunchEvent::SpawnError(e.to_string()))
                    .into_outcome();
            }
        };

        let pid = child.id();
        debug!(server = %name, port = plan.port, pid = ?pid, "Spawned adapter");

        let tail = StderrTail::default();
        let stderr_task = spawn::forward_output(name, &mut child, tail.clone());

        // An exit that is ready at the same time as the timer wins.
        let exited = tokio::select! {
            biased;
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(self.config.startup_timeout) => None,
        };

        let Some(status) = exited else {
            let resolved = pending.resolve(LaunchEvent::TimerElapsed { pid });
            self.watch(child, stderr_task, tail, resolved.clone());
            return resolved.into_outcome();
        };

        if let Some(task) = stderr_task {
            let _ = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, task).await;
        }
        let event = match status {
            Ok(status) => LaunchEvent::Exited {
                exit: status.into(),
                stderr_tail: tail.excerpt().await,
            },
            Err(e) => LaunchEvent::SpawnError(format!("failed to wait for adapter: {e}")),
        };
        pending.resolve(event).into_outcome()
    }

    /// Keep waiting on a running child so a late exit reaches the
    /// late-failure channel. The recorded outcome is not touched.
    fn watch(
        &self,
        mut child: tokio::process::Child,
        stderr_task: Option<tokio::task::JoinHandle<()>>,
        tail: StderrTail,
        resolved: ResolvedLaunch,
    ) {
        let late_tx = self.late_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            if let Some(task) = stderr_task {
                let _ = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, task).await;
            }
            let event = match status {
                Ok(status) => LaunchEvent::Exited {
                    exit: status.into(),
                    stderr_tail: tail.excerpt().await,
                },
                Err(e) => LaunchEvent::SpawnError(format!("failed to wait for adapter: {e}")),
            };
            if let Some(late) = resolved.late_event(event) {
                if let Err(mpsc::error::SendError(late)) = late_tx.send(late) {
                    log_late_failure(&late);
                }
            }
        });
    }
}

/// Log late failures as they arrive until every sender is gone.
pub async fn log_late_failures(mut late_rx: mpsc::UnboundedReceiver<LateFailure>) {
    while let Some(late) = late_rx.recv().await {
        log_late_failure(&late);
    }
}

fn log_late_failure(late: &LateFailure) {
    warn!(
        server = %late.name,
        port = late.port,
        pid = ?late.pid,
        error = %late.message,
        "Server stopped after startup; its recorded status is unchanged"
    );
}
