//! Bulk CSV import entry point
//!
//! Usage: bulk-import <ads.csv> [--wipe] [--prune]
//!
//! `--wipe` resets the store and the vault before loading; `--prune`
//! reclaims rows whose media stayed external after the load. Sweeps always
//! bracket the import, never overlap it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use scalatracker_core::application::importer::{ImportMode, Importer};
use scalatracker_core::application::sweeper::Sweeper;
use scalatracker_core::infrastructure::ad_repository::SqliteAdRepository;
use scalatracker_core::infrastructure::config::AppConfig;
use scalatracker_core::infrastructure::csv_loader::load_rows;
use scalatracker_core::infrastructure::database_connection::DatabaseConnection;
use scalatracker_core::infrastructure::http_client::{HttpClient, HttpClientConfig};
use scalatracker_core::infrastructure::logging::init_logging;
use scalatracker_core::infrastructure::media_vault::MediaVault;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let mut csv_path: Option<PathBuf> = None;
    let mut wipe = false;
    let mut prune = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--wipe" => wipe = true,
            "--prune" => prune = true,
            other if csv_path.is_none() => csv_path = Some(PathBuf::from(other)),
            other => bail!("unexpected argument: {other}"),
        }
    }
    let csv_path = csv_path.context("usage: bulk-import <ads.csv> [--wipe] [--prune]")?;

    let config = AppConfig::load()?;
    let db = DatabaseConnection::new(&config.database_url, config.workers_for_bulk() as u32)
        .await
        .context("Failed to open database")?;
    db.migrate().await?;

    let client = Arc::new(HttpClient::new(HttpClientConfig {
        timeout_seconds: config.request_timeout_seconds,
        max_requests_per_second: config.max_requests_per_second,
        follow_redirects: true,
    })?);
    let repository = Arc::new(SqliteAdRepository::new(db.pool().clone()));
    let vault = Arc::new(MediaVault::new(&config.vault_root, client)?);
    let sweeper = Sweeper::new(repository.clone(), &config.vault_root);

    if wipe {
        sweeper.full_wipe().await?;
    }

    let rows = load_rows(&csv_path)?;
    tracing::info!("Loaded {} rows from {}", rows.len(), csv_path.display());

    let importer = Importer::new(repository, vault, &config, ImportMode::Bulk);
    let summary = importer.import(rows).await?;

    if prune {
        sweeper.prune_external_only().await?;
    }

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
