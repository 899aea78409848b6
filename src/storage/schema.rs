//! Database schema definitions for both engines

/// SQLite: created_at holds a fixed-width UTC string so text order is time order
pub const SQLITE_CREATE_INVENTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS inventions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invention_id TEXT UNIQUE NOT NULL,
    domain_key TEXT NOT NULL,
    domain_name TEXT NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

pub const POSTGRES_CREATE_INVENTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS inventions (
    id SERIAL PRIMARY KEY,
    invention_id VARCHAR(255) UNIQUE NOT NULL,
    domain_key VARCHAR(255) NOT NULL,
    domain_name VARCHAR(255) NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Index statements are valid on both engines
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_domain_key ON inventions(domain_key)",
    "CREATE INDEX IF NOT EXISTS idx_created_at ON inventions(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_invention_id ON inventions(invention_id)",
];

pub fn sqlite_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![SQLITE_CREATE_INVENTIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

pub fn postgres_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![POSTGRES_CREATE_INVENTIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// `created_at` text layout in SQLite
pub const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
