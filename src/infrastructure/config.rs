//! Application configuration
//!
//! Defaults cover local development; an optional `scalatracker.toml` and
//! `SCALATRACKER_`-prefixed environment variables override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,
    /// Vault root directory for cached media blobs.
    pub vault_root: PathBuf,
    /// Per-request timeout for media downloads and page scans.
    pub request_timeout_seconds: u64,
    /// Upstream request pacing.
    pub max_requests_per_second: u32,
    /// Worker pool size for bulk file imports.
    pub bulk_workers: usize,
    /// Worker pool size for interactive / API-triggered imports.
    pub api_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/adscale.db".to_string(),
            vault_root: PathBuf::from("data/media"),
            request_timeout_seconds: 20,
            max_requests_per_second: 5,
            bulk_workers: 8,
            api_workers: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration from `scalatracker.toml` (optional) layered with
    /// `SCALATRACKER_*` environment variables.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("scalatracker").required(false))
            .add_source(config::Environment::with_prefix("SCALATRACKER"))
            .build()
            .context("Failed to assemble configuration sources")?;

        settings
            .try_deserialize()
            .context("Invalid configuration values")
    }

    /// Worker pool size for the given import volume profile.
    pub fn workers_for_bulk(&self) -> usize {
        self.bulk_workers.max(1)
    }

    pub fn workers_for_api(&self) -> usize {
        self.api_workers.max(1)
    }
}
