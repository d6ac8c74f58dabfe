//! Repository interface for ad signal persistence
//!
//! The ingestion core consumes this trait; the SQLite implementation lives
//! in the infrastructure layer. Implementations must make `upsert` atomic:
//! the record write and its history append commit together or not at all.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::ad::{AdPatch, AdRecord, HistoryEntry, UpsertOutcome};
use crate::domain::error::IngestResult;

#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> IngestResult<Option<AdRecord>>;

    /// Preload which of the given external ids already exist (used by the
    /// single-threaded batch path to skip per-row existence checks).
    async fn existing_ids(&self, ids: &[String]) -> IngestResult<HashSet<String>>;

    /// Create-if-absent, else partial update; always appends exactly one
    /// history entry with the current ad count. Atomic.
    async fn upsert(&self, patch: &AdPatch) -> IngestResult<UpsertOutcome>;

    /// Upsert with the existence decision already made by the caller.
    /// Must classify identically to `upsert` for the same inputs.
    async fn upsert_as(&self, patch: &AdPatch, exists: bool) -> IngestResult<UpsertOutcome>;

    /// History entries for one ad, oldest first.
    async fn history_for(&self, ad_id: &str) -> IngestResult<Vec<HistoryEntry>>;

    async fn count_ads(&self) -> IngestResult<i64>;

    /// Delete every ad and every history entry; returns deleted ad count.
    async fn delete_all(&self) -> IngestResult<u64>;

    /// Delete ads whose media reference is not a vault-relative path;
    /// returns the number of deleted rows.
    async fn delete_external_media(&self) -> IngestResult<u64>;
}
