// Database connection and pool management
// Pool size is tied to the worker count: each import worker draws its own
// connection so one slow commit never blocks a sibling.

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        let create_ads_sql = r#"
            CREATE TABLE IF NOT EXISTS ads (
                external_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                brand_id TEXT NOT NULL,
                brand_logo TEXT NOT NULL,
                platform TEXT NOT NULL,
                niche TEXT NOT NULL,
                region TEXT NOT NULL,
                creative_type TEXT NOT NULL,
                status TEXT NOT NULL,
                thumbnail TEXT,
                media_url TEXT,
                media_hash TEXT NOT NULL,
                copy_text TEXT,
                cta TEXT NOT NULL,
                insights TEXT NOT NULL,
                rating REAL NOT NULL,
                ad_count INTEGER NOT NULL DEFAULT 1,
                ticket_price TEXT NOT NULL,
                funnel_type TEXT NOT NULL,
                sales_page_url TEXT,
                library_url TEXT,
                targeting TEXT,
                performance TEXT,
                tech_stack TEXT,
                site_traffic TEXT,
                added_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;

        let create_history_sql = r#"
            CREATE TABLE IF NOT EXISTS ad_history (
                id TEXT PRIMARY KEY,
                ad_id TEXT NOT NULL,
                ad_count INTEGER NOT NULL,
                recorded_at DATETIME NOT NULL,
                FOREIGN KEY (ad_id) REFERENCES ads (external_id) ON DELETE CASCADE
            )
        "#;

        let create_indexes_sql = [
            "CREATE INDEX IF NOT EXISTS idx_ad_history_ad_id ON ad_history (ad_id)",
            "CREATE INDEX IF NOT EXISTS idx_ads_niche ON ads (niche)",
            "CREATE INDEX IF NOT EXISTS idx_ads_media_url ON ads (media_url)",
        ];

        sqlx::query(create_ads_sql).execute(&self.pool).await?;
        sqlx::query(create_history_sql).execute(&self.pool).await?;
        for sql in create_indexes_sql {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite:{}", db_path.to_string_lossy());

        let db = DatabaseConnection::new(&database_url, 4).await?;
        assert!(!db.pool().is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn test_database_migration() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("test_migration.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url, 4).await?;
        db.migrate().await?;

        let result = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('ads', 'ad_history')",
        )
        .fetch_all(db.pool())
        .await?;

        assert_eq!(result.len(), 2);
        Ok(())
    }
}
