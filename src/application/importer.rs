//! Ingestion coordinator - bounded fan-out over a batch of raw rows
//!
//! Each row is processed independently (normalize -> cache media -> upsert)
//! by a spawned task gated by a semaphore sized to the worker pool. Every
//! worker draws its own connection from the pool for its transaction, so a
//! slow commit or fetch only occupies that worker's slot. Row-level
//! failures are counted and logged, never surfaced individually; only
//! configuration failures abort the batch. There is no cancellation: rows
//! committed before an abort stay committed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tracing::{info, warn};

use crate::domain::ad::{AdPatch, UpsertOutcome};
use crate::domain::error::{IngestError, IngestResult};
use crate::domain::normalizer::{EXTERNAL_ID_ALIASES, RawAdRow, normalize};
use crate::domain::repositories::AdRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::media_vault::MediaVault;

/// Volume profile of the entry point triggering the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Large bulk file loads: higher-concurrency pool.
    Bulk,
    /// Interactive / API-triggered imports: conservative pool.
    Api,
}

/// Aggregate batch outcome; per-row diagnostics stay in the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: u32,
    pub updated: u32,
    pub errors: u32,
}

pub struct Importer {
    repository: Arc<dyn AdRepository>,
    vault: Arc<MediaVault>,
    workers: usize,
}

impl Importer {
    pub fn new(
        repository: Arc<dyn AdRepository>,
        vault: Arc<MediaVault>,
        config: &AppConfig,
        mode: ImportMode,
    ) -> Self {
        let workers = match mode {
            ImportMode::Bulk => config.workers_for_bulk(),
            ImportMode::Api => config.workers_for_api(),
        };
        Self {
            repository,
            vault,
            workers,
        }
    }

    /// Import a batch through the bounded worker pool. A batch that
    /// repeats an external id goes through the serial path instead: two
    /// pooled workers racing the same id would both pass the existence
    /// check and one would hit the primary key.
    pub async fn import(&self, rows: Vec<RawAdRow>) -> IngestResult<ImportSummary> {
        let mut seen = HashSet::new();
        let repeats = rows.iter().any(|row| {
            row.get_str(&EXTERNAL_ID_ALIASES)
                .is_some_and(|id| !seen.insert(id))
        });
        if repeats {
            info!("Batch repeats external ids; importing serially");
            return self.import_serial(rows).await;
        }

        let total = rows.len();
        info!("Importing batch of {} rows with {} workers", total, self.workers);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (sender, mut receiver) = mpsc::channel(total.max(1));

        for (index, row) in rows.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let sender = sender.clone();
            let repository = Arc::clone(&self.repository);
            let vault = Arc::clone(&self.vault);

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let outcome = process_row(repository.as_ref(), vault.as_ref(), row).await;
                let _ = sender.send((index, outcome)).await;
            });
        }
        drop(sender);

        let mut summary = ImportSummary::default();
        while let Some((index, outcome)) = receiver.recv().await {
            match outcome {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Row {} failed: {}", index, e);
                    summary.errors += 1;
                }
            }
        }

        info!(
            "Batch done: {} created, {} updated, {} errors",
            summary.created, summary.updated, summary.errors
        );
        Ok(summary)
    }

    /// Single-threaded variant that preloads the batch's existing ids in
    /// one query instead of checking existence per row. Classifies
    /// identically to `import` for the same inputs.
    pub async fn import_serial(&self, rows: Vec<RawAdRow>) -> IngestResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        let mut patches = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match normalize(row) {
                Ok(patch) => patches.push(patch),
                Err(e) => {
                    warn!("Row {} failed: {}", index, e);
                    summary.errors += 1;
                }
            }
        }

        let ids: Vec<String> = patches.iter().map(|p| p.external_id.clone()).collect();
        let mut existing = self.repository.existing_ids(&ids).await?;

        for mut patch in patches {
            if let Err(e) = resolve_media(self.vault.as_ref(), &mut patch).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Row {} failed: {}", patch.external_id, e);
                summary.errors += 1;
                continue;
            }
            let exists = existing.contains(&patch.external_id);
            match self.repository.upsert_as(&patch, exists).await {
                Ok(UpsertOutcome::Created) => {
                    // A duplicate id later in the batch must classify as an
                    // update, exactly like the per-row existence check would.
                    existing.insert(patch.external_id.clone());
                    summary.created += 1;
                }
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Row {} failed: {}", patch.external_id, e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// One row, end to end: normalize, cache media, upsert.
async fn process_row(
    repository: &dyn AdRepository,
    vault: &MediaVault,
    row: RawAdRow,
) -> IngestResult<UpsertOutcome> {
    let mut patch = normalize(&row)?;
    resolve_media(vault, &mut patch).await?;
    repository.upsert(&patch).await
}

/// Swap the patch's media reference for a vault reference when the
/// download succeeds. A fetch failure keeps the original external URL as
/// the settled reference; a later prune sweep can reclaim such rows.
async fn resolve_media(vault: &MediaVault, patch: &mut AdPatch) -> IngestResult<()> {
    let Some(url) = patch.media_url.clone() else {
        return Ok(());
    };

    match vault.fetch_or_cache(&url, &patch.external_id).await {
        Ok(local) => {
            if patch.thumbnail.as_deref() == Some(url.as_str()) {
                patch.thumbnail = Some(local.clone());
            }
            patch.media_url = Some(local);
        }
        Err(e @ IngestError::Fetch { .. }) => {
            warn!(
                "Keeping external media reference for {}: {}",
                patch.external_id, e
            );
        }
        Err(other) => return Err(other),
    }
    Ok(())
}
