//! ScalaTracker core - ad signal ingestion engine
//!
//! Ingests third-party ad signal rows (bulk CSV files or live API payloads),
//! normalizes them into canonical records, caches referenced media into a
//! local vault and upserts everything into SQLite while keeping an
//! append-only history of the ad count metric.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-exports for common call sites
pub use application::importer::{ImportMode, ImportSummary, Importer};
pub use application::scanner::{PageScanner, ScanResult};
pub use application::sweeper::Sweeper;
pub use domain::ad::{AdPatch, AdRecord, AdStatus, CreativeType, HistoryEntry, UpsertOutcome};
pub use domain::error::{IngestError, IngestResult};
pub use domain::normalizer::RawAdRow;
