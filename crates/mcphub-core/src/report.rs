// ABOUTME: Run report and progress reporting for batched launches.
// ABOUTME: Reporter is observational only; it never changes launch state.

use crate::supervisor::{LaunchOutcome, LaunchPlan};
use std::io::Write;

/// Outcomes recorded for one run, appended batch by batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    selected: usize,
    outcomes: Vec<LaunchOutcome>,
}

impl RunReport {
    pub fn new(selected: usize) -> Self {
        Self {
            selected,
            outcomes: Vec::with_capacity(selected),
        }
    }

    pub(crate) fn record(&mut self, outcomes: impl IntoIterator<Item = LaunchOutcome>) {
        self.outcomes.extend(outcomes);
    }

    /// Number of servers selected for the run.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn outcomes(&self) -> &[LaunchOutcome] {
        &self.outcomes
    }

    /// `(name, port)` for every server that was still alive at its timeout.
    pub fn running(&self) -> impl Iterator<Item = (&str, u16)> {
        self.outcomes.iter().filter_map(|o| match o {
            LaunchOutcome::Running { name, port, .. } => Some((name.as_str(), *port)),
            LaunchOutcome::Failed { .. } => None,
        })
    }

    /// `(name, error)` for every failed launch.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            LaunchOutcome::Failed { name, error } => Some((name.as_str(), error.as_str())),
            LaunchOutcome::Running { .. } => None,
        })
    }
}

/// Receives progress as the supervisor works through batches.
pub trait Reporter {
    fn batch_started(&mut self, batch: usize, total: usize, plans: &[LaunchPlan]);

    /// `outcomes[i]` belongs to `plans[i]`.
    fn batch_finished(
        &mut self,
        batch: usize,
        total: usize,
        plans: &[LaunchPlan],
        outcomes: &[LaunchOutcome],
    );

    fn summary(&mut self, report: &RunReport);
}

/// Prints progress lines for a human watching the terminal.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Write errors on the progress stream are ignored; the report is still returned.
impl<W: Write> Reporter for ConsoleReporter<W> {
    fn batch_started(&mut self, batch: usize, total: usize, plans: &[LaunchPlan]) {
        let _ = writeln!(
            self.out,
            "Starting batch {batch}/{total} ({} servers)...",
            plans.len()
        );
    }

    fn batch_finished(
        &mut self,
        _batch: usize,
        _total: usize,
        plans: &[LaunchPlan],
        outcomes: &[LaunchOutcome],
    ) {
        for (plan, outcome) in plans.iter().zip(outcomes) {
            let _ = match outcome {
                LaunchOutcome::Running { port, .. } => {
                    writeln!(self.out, "  ✓ {} running on port {}", plan.name(), port)
                }
                LaunchOutcome::Failed { error, .. } => {
                    writeln!(self.out, "  ✗ {} failed: {}", plan.name(), error)
                }
            };
        }
    }

    fn summary(&mut self, report: &RunReport) {
        let running = report.running().count();
        let failed = report.failed().count();
        let _ = writeln!(self.out);
        let _ = writeln!(
            self.out,
            "Started {running}/{} servers",
            report.selected()
        );
        if failed > 0 {
            let _ = writeln!(self.out, "{failed} failed");
        }
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServerDescriptor;

    fn plan(name: &str, port: u16) -> LaunchPlan {
        LaunchPlan {
            server: ServerDescriptor::new(name, "npx"),
            port,
        }
    }

    fn sample_report() -> (Vec<LaunchPlan>, Vec<LaunchOutcome>) {
        let plans = vec![plan("memory", 3001), plan("github", 3002)];
        let outcomes = vec![
            LaunchOutcome::Running {
                name: "memory".to_string(),
                port: 3001,
                pid: Some(100),
            },
            LaunchOutcome::Failed {
                name: "github".to_string(),
                error: "exited with code 1 before startup completed".to_string(),
            },
        ];
        (plans, outcomes)
    }

    #[test]
    fn test_run_report_partitions_outcomes() {
        let (_, outcomes) = sample_report();
        let mut report = RunReport::new(2);
        report.record(outcomes);

        assert_eq!(report.running().collect::<Vec<_>>(), vec![("memory", 3001)]);
        assert_eq!(report.failed().map(|(n, _)| n).collect::<Vec<_>>(), vec!["github"]);
    }

    #[test]
    fn test_console_reporter_output() {
        let (plans, outcomes) = sample_report();
        let mut reporter = ConsoleReporter::new(Vec::new());
        let mut report = RunReport::new(2);

        reporter.batch_started(1, 1, &plans);
        reporter.batch_finished(1, 1, &plans, &outcomes);
        report.record(outcomes);
        reporter.summary(&report);

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            output,
            "Starting batch 1/1 (2 servers)...\n\
             \x20 ✓ memory running on port 3001\n\
             \x20 ✗ github failed: exited with code 1 before startup completed\n\
             \n\
             Started 1/2 servers\n\
             1 failed\n"
        );
    }

    #[test]
    fn test_summary_omits_failed_line_when_none_failed() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.summary(&RunReport::new(0));

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(output, "\nStarted 0/0 servers\n");
    }
}
