// ABOUTME: mcphub core: launch stdio MCP servers behind network adapters and track which came up.
// ABOUTME: Re-exports config, registry, selector, supervisor, reporting and settings generation.

pub mod config;
pub mod env;
pub mod error;
pub mod registry;
pub mod report;
pub mod selector;
pub mod settings;
pub mod supervisor;

pub use config::{AdapterConfig, HubConfig, SettingsStyle};
pub use env::{load_env_file, process_snapshot, EnvSnapshot};
pub use error::{HubError, Result};
pub use registry::{Registry, ServerDescriptor};
pub use report::{ConsoleReporter, Reporter, RunReport};
pub use selector::Selection;
pub use settings::SettingsDocument;
pub use supervisor::{
    log_late_failures, plan_launches, LateFailure, LaunchOutcome, LaunchPlan, Supervisor,
};

/// Launch the selected servers and write settings for those that came up.
/// Per-server failures are part of the returned report; only errors
/// outside a single launch (such as writing the settings file) are returned
/// as `Err`.
pub async fn launch_and_write_settings(
    supervisor: &Supervisor,
    selected: &[ServerDescriptor],
    reporter: &mut dyn Reporter,
) -> Result<RunReport> {
    let config = supervisor.config();
    let plans = plan_launches(selected, config.base_port)?;
    let report = supervisor.run(&plans, reporter).await;
    SettingsDocument::build(config, &plans, Some(&report))?.write(&config.settings_path)?;
    Ok(report)
}

/// Write settings for every selected server at its predicted port without
/// launching anything.
pub fn generate_settings(config: &HubConfig, selected: &[ServerDescriptor]) -> Result<SettingsDocument> {
    let plans = plan_launches(selected, config.base_port)?;
    let document = SettingsDocument::build(config, &plans, None)?;
    document.write(&config.settings_path)?;
    Ok(document)
}
