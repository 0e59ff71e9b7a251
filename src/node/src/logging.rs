//! Tracing subscriber initialisation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSection;

/// Log line layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact coloured output for terminals
    #[default]
    Human,
    /// Plain output with targets, thread ids and line numbers
    Machine,
}

/// Pick the filter directive
///
/// `--verbose` wins, then `RUST_LOG`, then the configured level.
pub fn filter(config: &LoggingSection, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber; fails if one is already set
pub fn init(config: &LoggingSection, verbose: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(config, verbose));

    let result = match config.format {
        LogFormat::Human => builder.compact().with_ansi(true).try_init(),
        LogFormat::Machine => builder
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}
