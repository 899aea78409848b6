//! PostgreSQL storage implementation
//!
//! Connections come from a deadpool pool and go back to it when the pooled
//! object is dropped, whichever way the operation ends.
//!
//! Search folds case with `LOWER`, which only handles non-ASCII letters when
//! the database collation is UTF-8 aware (e.g. `en_US.UTF-8`); under the `C`
//! collation `Ä` and `ä` stay distinct.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::collections::BTreeMap;
use tokio_postgres::{NoTls, Row};

use super::schema;
use super::{
    ALL_PREVIEW_CHARS, DOMAIN_PREVIEW_CHARS, InventionRecord, InventionStore, InventionSummary,
    SEARCH_LIMIT, StoreStats, like_pattern, limit_param,
};
use crate::{Error, Result};

pub const DEFAULT_POOL_SIZE: usize = 8;

/// PostgreSQL-backed invention store
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Build a pool for `database_url` (`postgres://` or `postgresql://`).
    ///
    /// No connection is made until the first operation.
    pub fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_pool_size(database_url, DEFAULT_POOL_SIZE)
    }

    pub fn connect_with_pool_size(database_url: &str, max_size: usize) -> Result<Self> {
        if database_url.trim().is_empty() {
            return Err(Error::Configuration("DATABASE_URL is empty".to_string()));
        }

        let mut cfg = Config::new();
        cfg.url = Some(database_url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(max_size.max(1)));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::Storage(format!("Failed to create pool: {}", e)))?;

        Ok(Self { pool })
    }

    async fn client(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }
}

fn row_to_record(row: &Row) -> Result<InventionRecord> {
    Ok(InventionRecord {
        invention_id: row.try_get("invention_id")?,
        domain_key: row.try_get("domain_key")?,
        domain_name: row.try_get("domain_name")?,
        title: row.try_get::<_, Option<String>>("title")?.unwrap_or_default(),
        content: row.try_get("content")?,
        hash: row.try_get("hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_summary(row: &Row) -> Result<InventionSummary> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(InventionSummary {
        invention_id: row.try_get("invention_id")?,
        domain_key: row.try_get("domain_key")?,
        domain_name: row.try_get("domain_name")?,
        title: row.try_get::<_, Option<String>>("title")?.unwrap_or_default(),
        preview: row.try_get("preview")?,
        created_at,
        date: created_at.date_naive(),
    })
}

#[async_trait]
impl InventionStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<()> {
        let client = self.client().await?;
        for stmt in schema::postgres_schema_statements() {
            client.execute(stmt, &[]).await?;
        }
        tracing::info!("PostgreSQL database initialized");
        Ok(())
    }

    async fn save(&self, record: &InventionRecord) -> Result<()> {
        let mut client = self.client().await?;
        // Dropping an uncommitted transaction rolls it back
        let tx = client.transaction().await?;
        tx.execute(
            r#"
            INSERT INTO inventions (invention_id, domain_key, domain_name, title, content, hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (invention_id) DO UPDATE
            SET content = EXCLUDED.content,
                title = EXCLUDED.title,
                hash = EXCLUDED.hash
            "#,
            &[
                &record.invention_id,
                &record.domain_key,
                &record.domain_name,
                &record.title,
                &record.content,
                &record.hash,
                &record.created_at,
            ],
        )
        .await?;
        tx.commit().await?;
        tracing::debug!(invention_id = %record.invention_id, "Saved invention");
        Ok(())
    }

    async fn get_by_id(&self, domain_key: &str, invention_id: &str) -> Result<Option<InventionRecord>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                r#"
                SELECT invention_id, domain_key, domain_name, title, content, hash, created_at
                FROM inventions
                WHERE domain_key = $1 AND invention_id = $2
                "#,
                &[&domain_key, &invention_id],
            )
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_by_domain(&self, domain_key: &str, limit: Option<usize>) -> Result<Vec<InventionSummary>> {
        let client = self.client().await?;
        // LIMIT NULL is unbounded
        let limit = limit_param(limit);
        let preview_chars = DOMAIN_PREVIEW_CHARS as i32;
        let rows = client
            .query(
                r#"
                SELECT invention_id, domain_key, domain_name, title,
                       LEFT(content, $2) AS preview, created_at
                FROM inventions
                WHERE domain_key = $1
                ORDER BY created_at DESC, invention_id DESC
                LIMIT $3
                "#,
                &[&domain_key, &preview_chars, &limit],
            )
            .await?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<InventionSummary>> {
        let client = self.client().await?;
        let limit = limit_param(Some(limit));
        let preview_chars = ALL_PREVIEW_CHARS as i32;
        let rows = client
            .query(
                r#"
                SELECT invention_id, domain_key, domain_name, title,
                       LEFT(content, $1) AS preview, created_at
                FROM inventions
                ORDER BY created_at DESC, invention_id DESC
                LIMIT $2
                "#,
                &[&preview_chars, &limit],
            )
            .await?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn search(&self, query: &str) -> Result<Vec<InventionRecord>> {
        let client = self.client().await?;
        let pattern = like_pattern(query);
        let cap = SEARCH_LIMIT as i64;
        let rows = client
            .query(
                r#"
                SELECT invention_id, domain_key, domain_name, title, content, hash, created_at
                FROM inventions
                WHERE LOWER(content) LIKE $1 ESCAPE '\'
                   OR LOWER(title) LIKE $1 ESCAPE '\'
                ORDER BY created_at DESC, invention_id DESC
                LIMIT $2
                "#,
                &[&pattern, &cap],
            )
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count_by_domain(&self, domain_key: &str) -> Result<u64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM inventions WHERE domain_key = $1",
                &[&domain_key],
            )
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count as u64)
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        let client = self.client().await?;

        let total: i64 = client
            .query_one("SELECT COUNT(*) FROM inventions", &[])
            .await?
            .try_get(0)?;

        let rows = client
            .query(
                "SELECT domain_key, COUNT(*) FROM inventions GROUP BY domain_key",
                &[],
            )
            .await?;
        let mut by_domain = BTreeMap::new();
        for row in rows {
            let key: String = row.try_get(0)?;
            let count: i64 = row.try_get(1)?;
            by_domain.insert(key, count as u64);
        }

        Ok(StoreStats::from_counts(total as u64, by_domain))
    }
}

/// Runs only when `TEST_DATABASE_URL` points at a disposable database:
/// `TEST_DATABASE_URL=postgres://localhost/pim_test cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    async fn fresh_store() -> Option<PostgresStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let store = PostgresStore::connect(&url).unwrap();
        store.init().await.unwrap();
        store
            .client()
            .await
            .unwrap()
            .batch_execute(
                "DROP TRIGGER IF EXISTS reject_update ON inventions; \
                 TRUNCATE inventions;",
            )
            .await
            .unwrap();
        Some(store)
    }

    async fn reject_updates(store: &PostgresStore) {
        store
            .client()
            .await
            .unwrap()
            .batch_execute(
                "CREATE OR REPLACE FUNCTION reject_update() RETURNS trigger AS $$ \
                 BEGIN RAISE EXCEPTION 'boom'; END; $$ LANGUAGE plpgsql; \
                 CREATE TRIGGER reject_update BEFORE UPDATE ON inventions \
                 FOR EACH ROW EXECUTE FUNCTION reject_update();",
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_empty_url_is_configuration_error() {
        assert!(matches!(PostgresStore::connect("  "), Err(Error::Configuration(_))));
        assert!(matches!(
            PostgresStore::connect_with_pool_size("", 1),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_init_unreachable_is_storage_error() {
        let store = PostgresStore::connect_with_pool_size("postgres://pim@127.0.0.1:1/none", 1).unwrap();
        let err = store.init().await.unwrap_err();
        assert!(err.is_storage(), "unexpected error: {}", err);
    }

    #[tokio::test]
    #[ignore]
    async fn test_contract() {
        let Some(store) = fresh_store().await else { return };
        contract::upsert_preserves_created_at(&store).await;

        let store = fresh_store().await.unwrap();
        contract::get_by_id_matches_both_keys(&store).await;

        let store = fresh_store().await.unwrap();
        contract::listings_are_newest_first(&store).await;

        let store = fresh_store().await.unwrap();
        contract::search_is_case_insensitive_substring(&store).await;

        let store = fresh_store().await.unwrap();
        contract::search_is_capped(&store).await;

        let store = fresh_store().await.unwrap();
        contract::stats_group_by_domain(&store).await;

        let store = fresh_store().await.unwrap();
        contract::search_folds_non_ascii_case(&store).await;

        let store = fresh_store().await.unwrap();
        contract::init_is_idempotent(&store).await;

        let store = fresh_store().await.unwrap();
        contract::failed_upsert_keeps_old_row(&store, || reject_updates(&store)).await;
        fresh_store().await.unwrap();
    }
}
