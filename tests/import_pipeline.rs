//! End-to-end batch ingestion scenarios against a real SQLite file,
//! a real vault directory and a mock upstream CDN.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tempfile::{TempDir, tempdir};

use scalatracker_core::application::importer::{ImportMode, ImportSummary, Importer};
use scalatracker_core::application::sweeper::Sweeper;
use scalatracker_core::domain::ad::AdStatus;
use scalatracker_core::domain::normalizer::RawAdRow;
use scalatracker_core::domain::repositories::AdRepository;
use scalatracker_core::infrastructure::ad_repository::SqliteAdRepository;
use scalatracker_core::infrastructure::config::AppConfig;
use scalatracker_core::infrastructure::database_connection::DatabaseConnection;
use scalatracker_core::infrastructure::http_client::{HttpClient, HttpClientConfig};
use scalatracker_core::infrastructure::media_vault::MediaVault;

struct Harness {
    _dir: TempDir,
    repository: Arc<SqliteAdRepository>,
    importer: Importer,
    sweeper: Sweeper,
}

async fn harness(mode: ImportMode) -> Harness {
    let dir = tempdir().unwrap();
    let config = AppConfig::default();
    let url = format!("sqlite:{}", dir.path().join("ads.db").display());
    let db = DatabaseConnection::new(&url, config.workers_for_bulk() as u32)
        .await
        .unwrap();
    db.migrate().await.unwrap();

    let repository = Arc::new(SqliteAdRepository::new(db.pool().clone()));
    let client = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
    let vault_root = dir.path().join("media");
    let vault = Arc::new(MediaVault::new(&vault_root, client).unwrap());
    let importer = Importer::new(repository.clone(), vault, &config, mode);
    let sweeper = Sweeper::new(repository.clone(), &vault_root);

    Harness {
        _dir: dir,
        repository,
        importer,
        sweeper,
    }
}

fn row(pairs: &[(&str, &str)]) -> RawAdRow {
    let mut row = RawAdRow::default();
    for (key, value) in pairs {
        row.insert(*key, Value::String(value.to_string()));
    }
    row
}

fn vault_files(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn import_then_reimport_scenario() {
    let mut server = mockito::Server::new_async().await;
    let media = server
        .mock("GET", "/y.mp4")
        .with_body(b"creative bytes")
        .expect(1)
        .create_async()
        .await;

    let h = harness(ImportMode::Bulk).await;
    let media_url = format!("{}/y.mp4", server.url());
    let rows = || vec![row(&[("ID", "a1"), ("URL Criativo", &media_url), ("Info Ads", "45")])];

    let first = h.importer.import(rows()).await.unwrap();
    assert_eq!(
        first,
        ImportSummary {
            created: 1,
            updated: 0,
            errors: 0
        }
    );

    let record = h
        .repository
        .find_by_external_id("a1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AdStatus::Scaling);
    assert_eq!(record.ad_count, 45);
    let media_ref = record.media_url.unwrap();
    assert!(media_ref.starts_with("/media/"), "got {media_ref}");
    assert_eq!(record.thumbnail.unwrap(), media_ref);

    let history = h.repository.history_for("a1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ad_count, 45);

    // Re-importing the identical row updates in place, appends a second
    // identical snapshot and hits the vault cache instead of the network.
    let second = h.importer.import(rows()).await.unwrap();
    assert_eq!(
        second,
        ImportSummary {
            created: 0,
            updated: 1,
            errors: 0
        }
    );
    let history = h.repository.history_for("a1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].ad_count, history[1].ad_count);

    media.assert_async().await;
}

#[tokio::test]
async fn failed_download_falls_back_and_prunes_later() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/expired.mp4")
        .with_status(410)
        .create_async()
        .await;

    let h = harness(ImportMode::Api).await;
    let dead_url = format!("{}/expired.mp4", server.url());
    let summary = h
        .importer
        .import(vec![row(&[("ID", "a1"), ("URL Criativo", &dead_url)])])
        .await
        .unwrap();

    // The row proceeds with its external URL; the failure is not an error.
    assert_eq!(
        summary,
        ImportSummary {
            created: 1,
            updated: 0,
            errors: 0
        }
    );
    let record = h
        .repository
        .find_by_external_id("a1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.media_url.unwrap(), dead_url);

    let pruned = h.sweeper.prune_external_only().await.unwrap();
    assert_eq!(pruned, 1);
    assert_eq!(h.repository.count_ads().await.unwrap(), 0);
}

#[tokio::test]
async fn one_bad_row_leaves_the_rest_committed() {
    let h = harness(ImportMode::Bulk).await;

    let rows = vec![
        row(&[("ID", "a1"), ("Info Ads", "5")]),
        row(&[("Página", "sem id")]),
        row(&[("ID", "a2"), ("Info Ads", "7")]),
        row(&[("ID", "a3"), ("Info Ads", "50")]),
    ];
    let summary = h.importer.import(rows).await.unwrap();

    assert_eq!(
        summary,
        ImportSummary {
            created: 3,
            updated: 0,
            errors: 1
        }
    );
    assert_eq!(h.repository.count_ads().await.unwrap(), 3);
    for id in ["a1", "a2", "a3"] {
        assert!(h.repository.find_by_external_id(id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn serial_and_pooled_paths_classify_identically() {
    let seed = || vec![row(&[("ID", "a1"), ("Info Ads", "5")])];
    let dataset = |cdn: &str| {
        vec![
            row(&[("ID", "a1"), ("Info Ads", "6")]),
            row(&[("ID", "a2"), ("URL Criativo", cdn), ("Info Ads", "40")]),
            row(&[("ID", "a3"), ("Info Ads", "1")]),
        ]
    };

    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/c.png")
        .with_body(b"pixels")
        .expect_at_least(1)
        .create_async()
        .await;
    let cdn = format!("{}/c.png", server.url());

    let pooled = harness(ImportMode::Bulk).await;
    let serial = harness(ImportMode::Bulk).await;
    pooled.importer.import(seed()).await.unwrap();
    serial.importer.import_serial(seed()).await.unwrap();

    let pooled_summary = pooled.importer.import(dataset(&cdn)).await.unwrap();
    let serial_summary = serial.importer.import_serial(dataset(&cdn)).await.unwrap();

    assert_eq!(pooled_summary, serial_summary);
    assert_eq!(
        pooled_summary,
        ImportSummary {
            created: 2,
            updated: 1,
            errors: 0
        }
    );
}

#[tokio::test]
async fn full_wipe_resets_store_and_vault_before_a_fresh_load() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/v.mp4")
        .with_body(b"bytes")
        .expect_at_least(1)
        .create_async()
        .await;

    let h = harness(ImportMode::Bulk).await;
    let url = format!("{}/v.mp4", server.url());
    let vault_root = h._dir.path().join("media");

    h.importer
        .import(vec![row(&[("ID", "a1"), ("URL Criativo", &url)])])
        .await
        .unwrap();
    assert_eq!(vault_files(&vault_root), 1);

    h.sweeper.full_wipe().await.unwrap();
    assert_eq!(h.repository.count_ads().await.unwrap(), 0);
    assert_eq!(vault_files(&vault_root), 0);

    // A fresh load on the wiped generation classifies everything as created.
    let summary = h
        .importer
        .import(vec![row(&[("ID", "a1"), ("URL Criativo", &url)])])
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(h.repository.history_for("a1").await.unwrap().len(), 1);
}
