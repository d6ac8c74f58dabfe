//! Retention sweeper - out-of-band bulk cleanup
//!
//! Runs strictly before or after an ingestion run, never concurrently with
//! one: both modes delete in bulk and would race with in-flight writes.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::domain::error::{IngestError, IngestResult};
use crate::domain::repositories::AdRepository;

pub struct Sweeper {
    repository: Arc<dyn AdRepository>,
    vault_root: PathBuf,
}

impl Sweeper {
    pub fn new(repository: Arc<dyn AdRepository>, vault_root: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            vault_root: vault_root.into(),
        }
    }

    /// Reset before a fresh bulk load: every record, every history entry
    /// and every cached blob. Returns the number of deleted ads.
    pub async fn full_wipe(&self) -> IngestResult<u64> {
        let deleted = self.repository.delete_all().await?;

        if tokio::fs::try_exists(&self.vault_root).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&self.vault_root)
                .await
                .map_err(|e| {
                    IngestError::configuration(format!(
                        "cannot clear vault {}: {e}",
                        self.vault_root.display()
                    ))
                })?;
        }
        tokio::fs::create_dir_all(&self.vault_root)
            .await
            .map_err(|e| {
                IngestError::configuration(format!(
                    "cannot recreate vault {}: {e}",
                    self.vault_root.display()
                ))
            })?;

        info!("Full wipe removed {} ads and cleared the vault", deleted);
        Ok(deleted)
    }

    /// Reclaim records whose media was never durably cached: deletes every
    /// ad whose media reference is not a vault-relative path.
    pub async fn prune_external_only(&self) -> IngestResult<u64> {
        let deleted = self.repository.delete_external_media().await?;
        info!("Pruned {} ads without vault-local media", deleted);
        Ok(deleted)
    }
}
