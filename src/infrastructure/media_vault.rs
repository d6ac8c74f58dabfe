//! Media vault - deduplicating local cache for remote creatives
//!
//! Blob filenames are derived deterministically from (owner ad id, a
//! truncated hash of the source URL, a sniffed extension), so the same
//! (ad, URL) pair always lands on the same file and two ads never collide
//! even when they share a URL. An existing file is a cache hit and skips
//! the network entirely; a miss performs exactly one streamed GET.
//!
//! The vault directory is shared mutable state without locking. The
//! check-then-write race is benign: a batch is not expected to submit the
//! identical (ad id, URL) pair twice.
//!
//! Blob-level I/O failures are row-scoped fetch errors; only a vault root
//! that cannot be created is a configuration failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::ad::VAULT_PREFIX;
use crate::domain::error::{IngestError, IngestResult};
use crate::infrastructure::http_client::HttpClient;

/// Extension used when the URL's trailing segment does not look like a
/// plain short token.
const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 5;
const URL_HASH_LEN: usize = 16;
/// Owner segment cap so the blob filename always fits filesystem limits.
const MAX_OWNER_LEN: usize = 64;

pub struct MediaVault {
    root: PathBuf,
    client: Arc<HttpClient>,
}

impl MediaVault {
    /// Open (and create if needed) the vault at `root`.
    pub fn new(root: impl Into<PathBuf>, client: Arc<HttpClient>) -> IngestResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            IngestError::configuration(format!(
                "cannot create vault root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root, client })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic blob filename for one (owner, URL) pair.
    pub fn derive_filename(owner_id: &str, url: &str) -> String {
        let owner: String = owner_id
            .chars()
            .take(MAX_OWNER_LEN)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let hash = blake3::hash(url.as_bytes()).to_hex();
        let ext = Self::extension_for(url);
        format!("{owner}_{}.{ext}", &hash[..URL_HASH_LEN])
    }

    /// Extension from the URL's trailing path segment, when it is a short
    /// alphanumeric token; ambiguous or unsafe endings fall back to `bin`.
    fn extension_for(url: &str) -> String {
        let path = url.split(['?', '#']).next().unwrap_or("");
        let segment = path.rsplit('/').next().unwrap_or("");
        match segment.rsplit_once('.') {
            Some((_, ext))
                if !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LEN
                    && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext.to_ascii_lowercase()
            }
            _ => FALLBACK_EXTENSION.to_string(),
        }
    }

    /// Resolve a remote media URL to a vault reference, downloading at most
    /// once. Vault-relative input is returned unchanged; an existing blob
    /// is returned without any network I/O.
    pub async fn fetch_or_cache(&self, remote_url: &str, owner_id: &str) -> IngestResult<String> {
        if remote_url.starts_with(VAULT_PREFIX) {
            return Ok(remote_url.to_string());
        }

        let filename = Self::derive_filename(owner_id, remote_url);
        let blob_path = self.root.join(&filename);
        let vault_ref = format!("{VAULT_PREFIX}{filename}");

        if fs::try_exists(&blob_path).await.unwrap_or(false) {
            debug!("Vault cache hit for {} -> {}", remote_url, vault_ref);
            return Ok(vault_ref);
        }

        let response = self
            .client
            .get(remote_url)
            .await
            .map_err(|e| IngestError::fetch(remote_url, e))?;

        let mut file = fs::File::create(&blob_path).await.map_err(|e| {
            IngestError::fetch(
                remote_url,
                format!("cannot write vault blob {}: {e}", blob_path.display()),
            )
        })?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if let Err(e) = file.write_all(&bytes).await {
                        drop(file);
                        let _ = fs::remove_file(&blob_path).await;
                        return Err(IngestError::fetch(
                            remote_url,
                            format!("write failed for {}: {e}", blob_path.display()),
                        ));
                    }
                    written += bytes.len() as u64;
                }
                Err(e) => {
                    // Nothing from a broken transfer may survive in the vault.
                    drop(file);
                    let _ = fs::remove_file(&blob_path).await;
                    warn!("Transfer aborted for {}: {}", remote_url, e);
                    return Err(IngestError::fetch(remote_url, e));
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| IngestError::fetch(remote_url, format!("flush failed: {e}")))?;

        debug!("Cached {} bytes from {} -> {}", written, remote_url, vault_ref);
        Ok(vault_ref)
    }
}
