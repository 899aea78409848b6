//! Storage Layer - invention records behind one contract
//!
//! Two engines implement [`InventionStore`] and must answer every query
//! identically:
//! - [`PostgresStore`]: relational server, selected when a connection string is configured
//! - [`SqliteStore`]: embedded file, the fallback
//!
//! Table: inventions(invention_id, domain_key, domain_name, title, content, hash, created_at)

pub mod postgres;
pub mod schema;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Result;
use crate::config::{AppConfig, StorageBackend};

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Characters of content kept in per-domain listings
pub const DOMAIN_PREVIEW_CHARS: usize = 300;
/// Characters of content kept in the global listing
pub const ALL_PREVIEW_CHARS: usize = 200;
pub const SEARCH_LIMIT: usize = 50;
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// One generated document plus its metadata and integrity hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventionRecord {
    pub invention_id: String,
    pub domain_key: String,
    pub domain_name: String,
    pub title: String,
    pub content: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

impl InventionRecord {
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Listing entry: the record with a truncated preview instead of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventionSummary {
    pub invention_id: String,
    pub domain_key: String,
    pub domain_name: String,
    pub title: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_inventions: u64,
    pub domains_active: usize,
    pub by_domain: BTreeMap<String, u64>,
}

impl StoreStats {
    pub(crate) fn from_counts(total: u64, by_domain: BTreeMap<String, u64>) -> Self {
        Self {
            total_inventions: total,
            domains_active: by_domain.len(),
            by_domain,
        }
    }

    pub fn count_for(&self, domain_key: &str) -> u64 {
        self.by_domain.get(domain_key).copied().unwrap_or(0)
    }
}

/// Persistence contract shared by both engines.
///
/// Errors propagate to the caller untouched; presentation decides on fallbacks.
#[async_trait]
pub trait InventionStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Create the table and its indexes if absent.
    async fn init(&self) -> Result<()>;

    /// Upsert keyed on `invention_id`. Content, title and hash are
    /// overwritten; `created_at` keeps its first value.
    async fn save(&self, record: &InventionRecord) -> Result<()>;

    async fn get_by_id(&self, domain_key: &str, invention_id: &str) -> Result<Option<InventionRecord>>;

    /// Newest first, 300-character previews.
    async fn list_by_domain(&self, domain_key: &str, limit: Option<usize>) -> Result<Vec<InventionSummary>>;

    /// Newest first across every domain, 200-character previews.
    async fn list_all(&self, limit: usize) -> Result<Vec<InventionSummary>>;

    /// Case-insensitive substring match on content or title, newest first,
    /// at most 50 full records.
    async fn search(&self, query: &str) -> Result<Vec<InventionRecord>>;

    async fn count_by_domain(&self, domain_key: &str) -> Result<u64>;

    async fn get_stats(&self) -> Result<StoreStats>;
}

/// Pick the engine once at startup. The store is not initialised here.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn InventionStore>> {
    match config.storage_backend() {
        StorageBackend::Postgres(url) => {
            tracing::info!("Using PostgreSQL database");
            Ok(Arc::new(PostgresStore::connect(&url)?))
        }
        StorageBackend::Sqlite(path) => {
            tracing::info!(path = %path.display(), "Using SQLite database");
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
    }
}

/// Literal, lower-cased `%...%` pattern with LIKE metacharacters escaped by `\`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn limit_param(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("Polymer"), "%polymer%");
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }

    #[test]
    fn test_open_store_selects_sqlite_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            sqlite_path: dir.path().join("nested").join("inventions.db"),
            ..AppConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }
}
