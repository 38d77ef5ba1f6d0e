pub mod diagnostics;
pub mod driver;
pub mod repl;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter when `--log` is absent.
pub const LOG_ENV: &str = "GODEL_LOG";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Pick the log filter: an explicit `--log` value wins over `GODEL_LOG`,
/// which wins over the default.
pub fn log_filter(cli_filter: Option<&str>) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = cli_filter {
        return EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log filter `{}`", directives));
    }

    match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(&value)
            .with_context(|| format!("invalid {} filter `{}`", LOG_ENV, value)),
        _ => Ok(EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

/// Install the global `tracing` subscriber, writing to stderr.
pub fn init_logging(cli_filter: Option<&str>) -> anyhow::Result<()> {
    let filter = log_filter(cli_filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install log subscriber: {}", err))
}
