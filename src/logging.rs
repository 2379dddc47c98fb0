//! Tracing subscriber setup for the gateway and the one-shot client.
//!
//! The interactive TUI never installs a subscriber: it owns the terminal and
//! keeps its record in the session trace file instead.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber on stderr.
///
/// `RUST_LOG` wins when set and valid; otherwise `level` (a level name or a
/// full filter directive) is used.
pub fn init(level: &str) -> Result<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("Failed to install log subscriber: {err}"))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| anyhow!("Invalid log level '{level}': {err}"))
}
