//! # Perpetual Ideas Machine
//!
//! Periodically asks a generative-text provider for a structured invention
//! disclosure, seals it with a SHA-256 digest and keeps it browsable.
//!
//! The crate provides:
//! - A static registry of topic domains
//! - A content generator that talks to OpenAI or Anthropic, extracts the
//!   title and wraps the text in a hashed publication envelope
//! - Two interchangeable invention stores (PostgreSQL and an embedded
//!   SQLite file) behind one trait
//! - A cutoff-bounded background scheduler
//! - A read-side query engine and an HTTP API on top of it

pub mod clock;
pub mod config;
pub mod domain;
pub mod generator;
pub mod query;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use domain::{DomainInfo, DomainRegistry};
pub use generator::{Generator, ProviderKind};
pub use query::QueryEngine;
pub use scheduler::{Scheduler, SchedulerConfig, TickOutcome};
pub use storage::{InventionRecord, InventionStore, PostgresStore, SqliteStore};

/// Result type alias for Perpetual Ideas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Perpetual Ideas operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Storage error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Error::Provider {
            provider,
            message: message.into(),
        }
    }

    /// True for connectivity and query failures raised by either store.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Sqlite(_) | Error::Postgres(_) | Error::Pool(_) | Error::Storage(_)
        )
    }
}
