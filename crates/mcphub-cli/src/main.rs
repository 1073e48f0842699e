// ABOUTME: mcphub CLI entry point.
// ABOUTME: Loads config and registry, then lists, generates settings, or launches servers.

mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use mcphub_core::registry::DEFAULT_REGISTRY_PATH;
use mcphub_core::{
    generate_settings, launch_and_write_settings, load_env_file, log_late_failures,
    process_snapshot, ConsoleReporter, HubConfig, Registry, Selection, Supervisor,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mcphub")]
#[command(about = "Launch stdio MCP servers behind network adapters and write client settings")]
#[command(version)]
struct Cli {
    /// List available servers and exit
    #[arg(long)]
    list: bool,

    /// Write the settings file for the selected servers without launching them
    #[arg(long)]
    generate_settings: bool,

    /// Launch only these servers (comma-separated names)
    #[arg(long, value_delimiter = ',')]
    only: Option<Vec<String>>,

    /// Skip these servers (comma-separated names)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Server registry file
    #[arg(long, env = "MCP_HUB_REGISTRY", default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    /// KEY=VALUE file merged into the environment (existing variables win)
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Settings output path (overrides MCP_HUB_SETTINGS_PATH)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Debug logging, including server output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mcphub_log::init(cli.verbose);

    tokio::select! {
        result = run(cli) => {
            if let Err(e) = &result {
                error!(error = %format!("{e:#}"), "mcphub failed");
            }
            result
        }
        received = shutdown::wait_for_signal() => {
            let signal = received?;
            println!("\nReceived {signal}, shutting down.");
            std::process::exit(0);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let registry = Registry::load(&cli.registry).context("Failed to load server registry")?;

    if cli.list {
        print_list(&registry);
        return Ok(());
    }

    let mut env = process_snapshot();
    load_env_file(&cli.env_file, &mut env)
        .with_context(|| format!("Failed to load {}", cli.env_file.display()))?;

    let mut config = HubConfig::from_env(env).context("Invalid configuration")?;
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }

    let selection = Selection {
        only: cli.only,
        exclude: cli.exclude,
    };
    let selected = selection.apply(&registry);

    if cli.generate_settings {
        let document = generate_settings(&config, &selected)?;
        println!(
            "Wrote {} servers to {}",
            document.mcp_servers.len(),
            config.settings_path.display()
        );
        return Ok(());
    }

    info!(
        selected = selected.len(),
        registry = registry.len(),
        base_port = config.base_port,
        "Starting mcphub"
    );

    let settings_path = config.settings_path.clone();
    let (supervisor, late_rx) = Supervisor::new(config);
    tokio::spawn(log_late_failures(late_rx));

    let mut reporter = ConsoleReporter::stdout();
    let report = launch_and_write_settings(&supervisor, &selected, &mut reporter)
        .await
        .context("Failed to write settings")?;
    println!("Settings written to {}", settings_path.display());

    if report.running().next().is_none() {
        return Ok(());
    }

    info!("Servers running, press Ctrl+C to stop");
    std::future::pending::<()>().await;
    Ok(())
}

fn print_list(registry: &Registry) {
    println!("Available servers ({}):", registry.len());
    for (index, server) in registry.servers().iter().enumerate() {
        println!("{:>3}. {:<24} {}", index + 1, server.name, server.command_line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        let cli = Cli::parse_from(["mcphub", "--only", "memory,github", "--exclude", "github"]);
        assert_eq!(
            cli.only,
            Some(vec!["memory".to_string(), "github".to_string()])
        );
        assert_eq!(cli.exclude, vec!["github".to_string()]);
        assert!(!cli.list);
        assert!(!cli.generate_settings);
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["mcphub"]);
        assert!(cli.only.is_none());
        assert!(cli.exclude.is_empty());
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert!(cli.settings.is_none());
    }

    #[test]
    fn test_parse_short_circuit_flags() {
        let cli = Cli::parse_from(["mcphub", "--list", "--generate-settings"]);
        assert!(cli.list);
        assert!(cli.generate_settings);
    }

    #[tokio::test]
    async fn test_list_ignores_invalid_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("servers.toml");
        std::fs::write(&registry, "[[servers]]\nname = \"memory\"\ncommand = \"npx\"\n").unwrap();
        let env_file = dir.path().join("hub.env");
        std::fs::write(&env_file, "MCP_HUB_BASE_PORT=not-a-port\nMCP_HUB_SETTINGS_STYLE=yaml\n")
            .unwrap();

        let cli = Cli::parse_from([
            "mcphub".to_string(),
            "--list".to_string(),
            "--registry".to_string(),
            registry.display().to_string(),
            "--env-file".to_string(),
            env_file.display().to_string(),
        ]);
        run(cli).await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_settings_without_launching() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("servers.toml");
        std::fs::write(
            &registry,
            "[[servers]]\nname = \"memory\"\ncommand = \"npx\"\n\n\
             [[servers]]\nname = \"fetch\"\ncommand = \"uvx\"\n",
        )
        .unwrap();
        let env_file = dir.path().join("hub.env");
        std::fs::write(&env_file, "MCP_HUB_PUBLIC_HOST=hub.local\n").unwrap();
        let settings = dir.path().join("out").join("settings.json");

        let cli = Cli::parse_from([
            "mcphub".to_string(),
            "--generate-settings".to_string(),
            "--exclude".to_string(),
            "memory".to_string(),
            "--registry".to_string(),
            registry.display().to_string(),
            "--env-file".to_string(),
            env_file.display().to_string(),
            "--settings".to_string(),
            settings.display().to_string(),
        ]);
        run(cli).await.unwrap();

        let content = std::fs::read_to_string(&settings).unwrap();
        assert!(content.contains("\"fetch\""));
        assert!(!content.contains("\"memory\""));
    }
}
