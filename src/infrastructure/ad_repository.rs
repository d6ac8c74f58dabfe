//! SQLite implementation of the ad repository (upsert engine)
//!
//! `upsert` is the write path of the whole pipeline: create-if-absent by
//! external id, else a partial update that only touches fields present in
//! the patch, plus exactly one appended history row - all inside a single
//! transaction so a failed commit leaves neither write behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::ad::{
    AdPatch, AdRecord, AdStatus, CreativeType, HistoryEntry, UpsertOutcome, VAULT_PREFIX,
};
use crate::domain::error::IngestResult;
use crate::domain::repositories::AdRepository;

#[derive(Clone)]
pub struct SqliteAdRepository {
    pool: SqlitePool,
}

impl SqliteAdRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> AdRecord {
        let json = |name: &str| -> Option<serde_json::Value> {
            row.get::<Option<String>, _>(name)
                .and_then(|s| serde_json::from_str(&s).ok())
        };

        AdRecord {
            external_id: row.get("external_id"),
            title: row.get("title"),
            brand_id: row.get("brand_id"),
            brand_logo: row.get("brand_logo"),
            platform: row.get("platform"),
            niche: row.get("niche"),
            region: row.get("region"),
            creative_type: CreativeType::from_db_str(&row.get::<String, _>("creative_type")),
            status: AdStatus::from_db_str(&row.get::<String, _>("status")),
            thumbnail: row.get("thumbnail"),
            media_url: row.get("media_url"),
            media_hash: row.get("media_hash"),
            copy_text: row.get("copy_text"),
            cta: row.get("cta"),
            insights: row.get("insights"),
            rating: row.get("rating"),
            ad_count: row.get("ad_count"),
            ticket_price: row.get("ticket_price"),
            funnel_type: row.get("funnel_type"),
            sales_page_url: row.get("sales_page_url"),
            library_url: row.get("library_url"),
            targeting: json("targeting"),
            performance: json("performance"),
            tech_stack: json("tech_stack"),
            site_traffic: json("site_traffic"),
            added_at: row.get("added_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

const SELECT_AD_SQL: &str = r#"
    SELECT external_id, title, brand_id, brand_logo, platform, niche, region,
           creative_type, status, thumbnail, media_url, media_hash, copy_text,
           cta, insights, rating, ad_count, ticket_price, funnel_type,
           sales_page_url, library_url, targeting, performance, tech_stack,
           site_traffic, added_at, updated_at
    FROM ads WHERE external_id = ?
"#;

#[async_trait]
impl AdRepository for SqliteAdRepository {
    async fn find_by_external_id(&self, external_id: &str) -> IngestResult<Option<AdRecord>> {
        let row = sqlx::query(SELECT_AD_SQL)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::map_row))
    }

    async fn existing_ids(&self, ids: &[String]) -> IngestResult<HashSet<String>> {
        // SQLite caps bound variables per statement; query in chunks.
        const CHUNK_SIZE: usize = 500;

        let mut found = HashSet::new();
        for chunk in ids.chunks(CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql =
                format!("SELECT external_id FROM ads WHERE external_id IN ({placeholders})");
            let mut query = sqlx::query_scalar::<_, String>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            found.extend(query.fetch_all(&self.pool).await?);
        }
        Ok(found)
    }

    async fn upsert(&self, patch: &AdPatch) -> IngestResult<UpsertOutcome> {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT external_id FROM ads WHERE external_id = ?")
                .bind(&patch.external_id)
                .fetch_optional(&self.pool)
                .await?;
        self.upsert_as(patch, exists.is_some()).await
    }

    async fn upsert_as(&self, patch: &AdPatch, exists: bool) -> IngestResult<UpsertOutcome> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let outcome = if exists {
            // Only fields present in the patch are overwritten; a row with
            // no creative URL must not blank a previously cached one.
            let mut sets = vec![
                "title = ?",
                "brand_id = ?",
                "brand_logo = ?",
                "platform = ?",
                "niche = ?",
                "region = ?",
                "creative_type = ?",
                "status = ?",
                "media_hash = ?",
                "cta = ?",
                "insights = ?",
                "rating = ?",
                "ad_count = ?",
                "ticket_price = ?",
                "funnel_type = ?",
            ];
            if patch.thumbnail.is_some() {
                sets.push("thumbnail = ?");
            }
            if patch.media_url.is_some() {
                sets.push("media_url = ?");
            }
            if patch.copy_text.is_some() {
                sets.push("copy_text = ?");
            }
            if patch.sales_page_url.is_some() {
                sets.push("sales_page_url = ?");
            }
            if patch.library_url.is_some() {
                sets.push("library_url = ?");
            }
            if patch.targeting.is_some() {
                sets.push("targeting = ?");
            }
            if patch.performance.is_some() {
                sets.push("performance = ?");
            }
            if patch.tech_stack.is_some() {
                sets.push("tech_stack = ?");
            }
            if patch.site_traffic.is_some() {
                sets.push("site_traffic = ?");
            }
            sets.push("updated_at = ?");

            let sql = format!("UPDATE ads SET {} WHERE external_id = ?", sets.join(", "));
            let mut query = sqlx::query(&sql)
                .bind(&patch.title)
                .bind(&patch.brand_id)
                .bind(&patch.brand_logo)
                .bind(&patch.platform)
                .bind(&patch.niche)
                .bind(&patch.region)
                .bind(patch.creative_type.as_db_str())
                .bind(patch.status.as_db_str())
                .bind(&patch.media_hash)
                .bind(&patch.cta)
                .bind(&patch.insights)
                .bind(patch.rating)
                .bind(patch.ad_count)
                .bind(&patch.ticket_price)
                .bind(&patch.funnel_type);
            if let Some(v) = &patch.thumbnail {
                query = query.bind(v);
            }
            if let Some(v) = &patch.media_url {
                query = query.bind(v);
            }
            if let Some(v) = &patch.copy_text {
                query = query.bind(v);
            }
            if let Some(v) = &patch.sales_page_url {
                query = query.bind(v);
            }
            if let Some(v) = &patch.library_url {
                query = query.bind(v);
            }
            if let Some(v) = &patch.targeting {
                query = query.bind(v.to_string());
            }
            if let Some(v) = &patch.performance {
                query = query.bind(v.to_string());
            }
            if let Some(v) = &patch.tech_stack {
                query = query.bind(v.to_string());
            }
            if let Some(v) = &patch.site_traffic {
                query = query.bind(v.to_string());
            }
            query
                .bind(now)
                .bind(&patch.external_id)
                .execute(&mut *tx)
                .await?;

            UpsertOutcome::Updated
        } else {
            let record = patch.clone().into_record(now);
            sqlx::query(
                r#"
                INSERT INTO ads
                (external_id, title, brand_id, brand_logo, platform, niche, region,
                 creative_type, status, thumbnail, media_url, media_hash, copy_text,
                 cta, insights, rating, ad_count, ticket_price, funnel_type,
                 sales_page_url, library_url, targeting, performance, tech_stack,
                 site_traffic, added_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.external_id)
            .bind(&record.title)
            .bind(&record.brand_id)
            .bind(&record.brand_logo)
            .bind(&record.platform)
            .bind(&record.niche)
            .bind(&record.region)
            .bind(record.creative_type.as_db_str())
            .bind(record.status.as_db_str())
            .bind(&record.thumbnail)
            .bind(&record.media_url)
            .bind(&record.media_hash)
            .bind(&record.copy_text)
            .bind(&record.cta)
            .bind(&record.insights)
            .bind(record.rating)
            .bind(record.ad_count)
            .bind(&record.ticket_price)
            .bind(&record.funnel_type)
            .bind(&record.sales_page_url)
            .bind(&record.library_url)
            .bind(record.targeting.as_ref().map(|v| v.to_string()))
            .bind(record.performance.as_ref().map(|v| v.to_string()))
            .bind(record.tech_stack.as_ref().map(|v| v.to_string()))
            .bind(record.site_traffic.as_ref().map(|v| v.to_string()))
            .bind(record.added_at)
            .bind(record.updated_at)
            .execute(&mut *tx)
            .await?;

            UpsertOutcome::Created
        };

        // Exactly one audit entry per successful write, same transaction.
        sqlx::query(
            "INSERT INTO ad_history (id, ad_id, ad_count, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&patch.external_id)
        .bind(patch.ad_count)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    async fn history_for(&self, ad_id: &str) -> IngestResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, ad_id, ad_count, recorded_at
            FROM ad_history WHERE ad_id = ?
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(ad_id)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| HistoryEntry {
                id: row.get("id"),
                ad_id: row.get("ad_id"),
                ad_count: row.get("ad_count"),
                recorded_at: row.get::<DateTime<Utc>, _>("recorded_at"),
            })
            .collect();

        Ok(entries)
    }

    async fn count_ads(&self) -> IngestResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_all(&self) -> IngestResult<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ad_history")
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM ads").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(deleted.rows_affected())
    }

    async fn delete_external_media(&self) -> IngestResult<u64> {
        let pattern = format!("{VAULT_PREFIX}%");
        let deleted =
            sqlx::query("DELETE FROM ads WHERE media_url IS NULL OR media_url NOT LIKE ?")
                .bind(pattern)
                .execute(&self.pool)
                .await?;
        Ok(deleted.rows_affected())
    }
}
