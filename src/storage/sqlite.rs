//! SQLite storage implementation
//!
//! The connection lives behind a mutex and every query runs on the blocking
//! pool; the guard is dropped when the closure returns, on success or error.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::schema::{self, SQLITE_TIMESTAMP_FORMAT};
use super::{
    ALL_PREVIEW_CHARS, DOMAIN_PREVIEW_CHARS, InventionRecord, InventionStore, InventionSummary,
    SEARCH_LIMIT, StoreStats, like_pattern, limit_param,
};
use crate::config::ensure_db_dir;
use crate::{Error, Result};

/// Unicode-aware lower(); SQLite's built-in only folds ASCII
const LOWER_FN: &str = "pim_lower";

/// SQLite-backed invention store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a database file (creates it and its directory if missing)
    pub fn open(path: &Path) -> Result<Self> {
        ensure_db_dir(path)?;
        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.create_scalar_function(
            LOWER_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("sqlite connection mutex poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("sqlite worker failed: {}", e)))?
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(SQLITE_TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Columns: invention_id, domain_key, domain_name, title, content, hash, created_at
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<InventionRecord> {
    let created_at: String = row.get(6)?;
    Ok(InventionRecord {
        invention_id: row.get(0)?,
        domain_key: row.get(1)?,
        domain_name: row.get(2)?,
        title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        content: row.get(4)?,
        hash: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

/// Columns: invention_id, domain_key, domain_name, title, preview, created_at
fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<InventionSummary> {
    let raw: String = row.get(5)?;
    let created_at = parse_timestamp(5, &raw)?;
    Ok(InventionSummary {
        invention_id: row.get(0)?,
        domain_key: row.get(1)?,
        domain_name: row.get(2)?,
        title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        preview: row.get(4)?,
        created_at,
        date: created_at.date_naive(),
    })
}

#[async_trait]
impl InventionStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            for stmt in schema::sqlite_schema_statements() {
                conn.execute(stmt, [])?;
            }
            tracing::info!("SQLite database initialized");
            Ok(())
        })
        .await
    }

    async fn save(&self, record: &InventionRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            // Dropping an uncommitted transaction rolls it back
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO inventions (invention_id, domain_key, domain_name, title, content, hash, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(invention_id) DO UPDATE
                SET content = excluded.content,
                    title = excluded.title,
                    hash = excluded.hash
                "#,
                params![
                    record.invention_id,
                    record.domain_key,
                    record.domain_name,
                    record.title,
                    record.content,
                    record.hash,
                    format_timestamp(&record.created_at),
                ],
            )?;
            tx.commit()?;
            tracing::debug!(invention_id = %record.invention_id, "Saved invention");
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, domain_key: &str, invention_id: &str) -> Result<Option<InventionRecord>> {
        let domain_key = domain_key.to_string();
        let invention_id = invention_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                r#"
                SELECT invention_id, domain_key, domain_name, title, content, hash, created_at
                FROM inventions
                WHERE domain_key = ?1 AND invention_id = ?2
                "#,
                params![domain_key, invention_id],
                row_to_record,
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    async fn list_by_domain(&self, domain_key: &str, limit: Option<usize>) -> Result<Vec<InventionSummary>> {
        let domain_key = domain_key.to_string();
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit_param(limit).unwrap_or(-1);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT invention_id, domain_key, domain_name, title, substr(content, 1, ?2), created_at
                FROM inventions
                WHERE domain_key = ?1
                ORDER BY created_at DESC, invention_id DESC
                LIMIT ?3
                "#,
            )?;
            let summaries = stmt
                .query_map(params![domain_key, DOMAIN_PREVIEW_CHARS as i64, limit], row_to_summary)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(summaries)
        })
        .await
    }

    async fn list_all(&self, limit: usize) -> Result<Vec<InventionSummary>> {
        let limit = limit_param(Some(limit)).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT invention_id, domain_key, domain_name, title, substr(content, 1, ?1), created_at
                FROM inventions
                ORDER BY created_at DESC, invention_id DESC
                LIMIT ?2
                "#,
            )?;
            let summaries = stmt
                .query_map(params![ALL_PREVIEW_CHARS as i64, limit], row_to_summary)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(summaries)
        })
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<InventionRecord>> {
        let pattern = like_pattern(query);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT invention_id, domain_key, domain_name, title, content, hash, created_at
                FROM inventions
                WHERE pim_lower(content) LIKE ?1 ESCAPE '\'
                   OR pim_lower(title) LIKE ?1 ESCAPE '\'
                ORDER BY created_at DESC, invention_id DESC
                LIMIT ?2
                "#,
            )?;
            let records = stmt
                .query_map(params![pattern, SEARCH_LIMIT as i64], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn count_by_domain(&self, domain_key: &str) -> Result<u64> {
        let domain_key = domain_key.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM inventions WHERE domain_key = ?1",
                [domain_key],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn get_stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM inventions", [], |row| row.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT domain_key, COUNT(*) FROM inventions GROUP BY domain_key",
            )?;
            let by_domain = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

            Ok(StoreStats::from_counts(total as u64, by_domain))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    async fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        contract::upsert_preserves_created_at(&store().await).await;
    }

    #[tokio::test]
    async fn test_get_by_id_matches_both_keys() {
        contract::get_by_id_matches_both_keys(&store().await).await;
    }

    #[tokio::test]
    async fn test_listings_are_newest_first() {
        contract::listings_are_newest_first(&store().await).await;
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        contract::search_is_case_insensitive_substring(&store().await).await;
    }

    #[tokio::test]
    async fn test_search_is_capped() {
        contract::search_is_capped(&store().await).await;
    }

    #[tokio::test]
    async fn test_stats_group_by_domain() {
        contract::stats_group_by_domain(&store().await).await;
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        contract::init_is_idempotent(&store().await).await;
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        contract::search_folds_non_ascii_case(&store().await).await;
    }

    #[tokio::test]
    async fn test_failed_upsert_keeps_old_row() {
        let store = store().await;
        contract::failed_upsert_keeps_old_row(&store, || async {
            store
                .with_conn(|conn| {
                    conn.execute_batch(
                        "CREATE TRIGGER reject_update BEFORE UPDATE ON inventions \
                         BEGIN SELECT RAISE(ABORT, 'boom'); END;",
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        })
        .await;

        // The connection is usable again after the rollback
        assert_eq!(store.count_by_domain("biotechnology").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventions.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.init().await.unwrap();
            let record = contract::record("inv-f", "biotechnology", "TITLE: Kept", contract::base_time());
            store.save(&record).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        reopened.init().await.unwrap();
        let record = reopened.get_by_id("biotechnology", "inv-f").await.unwrap().unwrap();
        assert_eq!(record.title, "Kept");
        assert_eq!(record.created_at, contract::base_time());
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_query_before_init_propagates_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.count_by_domain("biotechnology").await.unwrap_err();
        assert!(err.is_storage());
    }
}
