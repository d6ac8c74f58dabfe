//! Logging initialization
//!
//! Console subscriber with `RUST_LOG`-style filtering; defaults to `info`
//! for this crate when no filter is set.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scalatracker_core=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}
