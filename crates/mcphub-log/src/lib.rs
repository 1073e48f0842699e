// ABOUTME: Shared logging setup for mcphub binaries
// ABOUTME: Logs to stderr so stdout stays free for progress and listings

use tracing_subscriber::EnvFilter;

/// Crates whose logs are shown at the hub's own level.
const HUB_CRATES: [&str; 2] = ["mcphub_core", "mcphub"];

/// Build the filter: hub crates at INFO (DEBUG when `verbose`, which also
/// surfaces child process output), everything else at WARN. RUST_LOG
/// directives are applied on top.
pub fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    HUB_CRATES.iter().fold(
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        |filter, krate| match format!("{krate}={level}").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        },
    )
}

/// Standard logging to stderr.
pub fn init(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}
