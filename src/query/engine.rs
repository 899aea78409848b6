//! Query engine implementation
//!
//! Read-side operations the CLI and HTTP API share:
//! - Statistics and the recent-inventions dashboard
//! - Per-domain and global listings
//! - Full-text search with match context
//! - Manual generation in a validated domain

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::snippet::match_context;
use crate::domain::{DomainInfo, DomainRegistry};
use crate::generator::Generator;
use crate::storage::{InventionRecord, InventionStore, InventionSummary, StoreStats};
use crate::{Error, Result};

/// Inventions shown on the statistics dashboard
pub const RECENT_LIMIT: usize = 20;

/// One search result with context around the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub invention_id: String,
    pub domain_key: String,
    pub domain_name: String,
    pub title: String,
    pub context: String,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
}

impl SearchHit {
    fn from_record(record: InventionRecord, query: &str) -> Self {
        let context = match_context(&record.content, query);
        let date = record.date();
        Self {
            invention_id: record.invention_id,
            domain_key: record.domain_key,
            domain_name: record.domain_name,
            title: record.title,
            context,
            created_at: record.created_at,
            date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsPage {
    #[serde(flatten)]
    pub stats: StoreStats,
    pub recent_inventions: Vec<InventionSummary>,
}

/// Registry entry plus how many inventions it holds
#[derive(Debug, Clone, Serialize)]
pub struct DomainOverview {
    pub key: &'static str,
    #[serde(flatten)]
    pub info: DomainInfo,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainPage {
    pub key: &'static str,
    #[serde(flatten)]
    pub info: DomainInfo,
    pub inventions: Vec<InventionSummary>,
}

/// Query engine over an invention store
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn InventionStore>,
    registry: DomainRegistry,
    generator: Option<Arc<Generator>>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn InventionStore>, registry: DomainRegistry) -> Self {
        Self {
            store,
            registry,
            generator: None,
        }
    }

    /// Enable [`QueryEngine::generate`]
    pub fn with_generator(mut self, generator: Arc<Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn InventionStore> {
        &self.store
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.get_stats().await
    }

    /// Stats plus the 20 newest inventions
    pub async fn stats_page(&self) -> Result<StatsPage> {
        let stats = self.store.get_stats().await?;
        let recent_inventions = self.recent(RECENT_LIMIT).await?;
        Ok(StatsPage {
            stats,
            recent_inventions,
        })
    }

    /// Every registered domain with its invention count, in registry order
    pub async fn domains(&self) -> Result<Vec<DomainOverview>> {
        let stats = self.store.get_stats().await?;
        Ok(self
            .registry
            .list_all()
            .map(|(key, info)| DomainOverview {
                key,
                info: *info,
                count: stats.count_for(key),
            })
            .collect())
    }

    fn domain_info(&self, domain_key: &str) -> Result<(&'static str, &'static DomainInfo)> {
        self.registry
            .list_all()
            .find(|(key, _)| *key == domain_key)
            .ok_or_else(|| Error::UnknownDomain(domain_key.to_string()))
    }

    /// Listing for one registered domain
    pub async fn by_domain(&self, domain_key: &str, limit: Option<usize>) -> Result<DomainPage> {
        let (key, info) = self.domain_info(domain_key)?;
        let inventions = self.store.list_by_domain(key, limit).await?;
        Ok(DomainPage {
            key,
            info: *info,
            inventions,
        })
    }

    pub async fn by_id(&self, domain_key: &str, invention_id: &str) -> Result<Option<InventionRecord>> {
        self.store.get_by_id(domain_key, invention_id).await
    }

    pub async fn all(&self, limit: usize) -> Result<Vec<InventionSummary>> {
        self.store.list_all(limit).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<InventionSummary>> {
        self.all(limit).await
    }

    /// Blank queries return nothing without touching the store.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = self.store.search(query).await?;
        Ok(records
            .into_iter()
            .map(|record| SearchHit::from_record(record, query))
            .collect())
    }

    /// Generate one invention in a registered domain. Returns its id.
    pub async fn generate(&self, domain_key: &str) -> Result<String> {
        let (key, info) = self.domain_info(domain_key)?;
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::Configuration("generation is not enabled".to_string()))?;
        generator.generate(key, info.name).await
    }
}
