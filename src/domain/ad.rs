//! Canonical ad record types
//!
//! An `AdRecord` is uniquely keyed by its external id. Its media reference
//! is either a vault-relative path (`/media/...`) or the original external
//! URL - never both, by convention. `AdPatch` is the explicit partial-update
//! structure produced by the normalizer: on update only `Some` fields are
//! overwritten, so an incoming row can never blank a field implicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::constants::SCALING_THRESHOLD;

/// Prefix that marks a media reference as vault-local.
pub const VAULT_PREFIX: &str = "/media/";

/// Returns true when a media reference points into the local vault.
pub fn is_vault_ref(media_url: &str) -> bool {
    media_url.starts_with(VAULT_PREFIX)
}

/// Creative type of an ad signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreativeType {
    Image,
    Video,
    Direct,
}

impl CreativeType {
    /// Stored database label (kept compatible with the historical dataset).
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Image => "Imagem",
            Self::Video => "VSL",
            Self::Direct => "Direto",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "Imagem" => Self::Image,
            "VSL" => Self::Video,
            _ => Self::Direct,
        }
    }
}

/// Display status derived from the ad count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdStatus {
    Validated,
    Scaling,
}

impl AdStatus {
    pub fn for_count(count: i64) -> Self {
        if count > SCALING_THRESHOLD {
            Self::Scaling
        } else {
            Self::Validated
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Validated => "Validado",
            Self::Scaling => "Escala",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        if s == "Escala" { Self::Scaling } else { Self::Validated }
    }
}

/// Outcome of an upsert, reported per row to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Canonical persisted ad record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    pub external_id: String,
    pub title: String,
    pub brand_id: String,
    pub brand_logo: String,
    pub platform: String,
    pub niche: String,
    pub region: String,
    pub creative_type: CreativeType,
    pub status: AdStatus,
    pub thumbnail: Option<String>,
    pub media_url: Option<String>,
    pub media_hash: String,
    pub copy_text: Option<String>,
    pub cta: String,
    pub insights: String,
    pub rating: f64,
    pub ad_count: i64,
    pub ticket_price: String,
    pub funnel_type: String,
    pub sales_page_url: Option<String>,
    pub library_url: Option<String>,
    pub targeting: Option<Value>,
    pub performance: Option<Value>,
    pub tech_stack: Option<Value>,
    pub site_traffic: Option<Value>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One append-only audit entry: the ad count snapshot at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub ad_id: String,
    pub ad_count: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Explicit partial-update structure for one canonical record.
///
/// Fields the normalizer always derives are plain values; fields that may
/// legitimately be absent from a source row are `Option` and are skipped on
/// update when `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPatch {
    pub external_id: String,
    pub title: String,
    pub brand_id: String,
    pub brand_logo: String,
    pub platform: String,
    pub niche: String,
    pub region: String,
    pub creative_type: CreativeType,
    pub status: AdStatus,
    pub media_hash: String,
    pub cta: String,
    pub insights: String,
    pub rating: f64,
    pub ad_count: i64,
    pub ticket_price: String,
    pub funnel_type: String,
    pub thumbnail: Option<String>,
    pub media_url: Option<String>,
    pub copy_text: Option<String>,
    pub sales_page_url: Option<String>,
    pub library_url: Option<String>,
    pub targeting: Option<Value>,
    pub performance: Option<Value>,
    pub tech_stack: Option<Value>,
    pub site_traffic: Option<Value>,
}

impl AdPatch {
    /// Materialize a full record for the insert path.
    pub fn into_record(self, now: DateTime<Utc>) -> AdRecord {
        AdRecord {
            external_id: self.external_id,
            title: self.title,
            brand_id: self.brand_id,
            brand_logo: self.brand_logo,
            platform: self.platform,
            niche: self.niche,
            region: self.region,
            creative_type: self.creative_type,
            status: self.status,
            thumbnail: self.thumbnail,
            media_url: self.media_url,
            media_hash: self.media_hash,
            copy_text: self.copy_text,
            cta: self.cta,
            insights: self.insights,
            rating: self.rating,
            ad_count: self.ad_count,
            ticket_price: self.ticket_price,
            funnel_type: self.funnel_type,
            sales_page_url: self.sales_page_url,
            library_url: self.library_url,
            targeting: self.targeting,
            performance: self.performance,
            tech_stack: self.tech_stack,
            site_traffic: self.site_traffic,
            added_at: now,
            updated_at: now,
        }
    }
}
