//! Logging setup for the command line tool
//!
//! Logs go to stderr so stdout stays clean for reports. `RUST_LOG` takes
//! precedence over the filter picked here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const QUIET_FILTER: &str = "warn";
const VERBOSE_FILTER: &str =
    "warn,dbdelta=debug,dbdelta_core=debug,dbdelta_compare=debug,dbdelta_driver_sqlite=debug";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { QUIET_FILTER }
}

pub fn init(verbose: bool, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbose)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::debug!(verbose, ?format, "logging initialized");
    Ok(())
}
