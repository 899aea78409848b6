use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::generator::ProviderKind;

pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SQLITE_PATH: &str = "local_inventions.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub provider_timeout_secs: u64,
    pub auto_generate: bool,
    pub auto_generate_interval: u64,
    pub database_url: Option<String>,
    pub sqlite_path: PathBuf,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_api_key: None,
            anthropic_api_key: None,
            openai_model: "gpt-4".to_string(),
            anthropic_model: "claude-3-5-sonnet-20241022".to_string(),
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            auto_generate: true,
            auto_generate_interval: DEFAULT_INTERVAL_SECS,
            database_url: None,
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            port: 5000,
        }
    }
}

/// Which store the process runs against, fixed for its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres(String),
    Sqlite(PathBuf),
}

impl AppConfig {
    /// Overlay recognised environment variables onto this config.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("AI_PROVIDER") {
            self.provider = ProviderKind::from_setting(&provider);
        }
        if let Some(key) = non_empty(lookup("OPENAI_API_KEY")) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty(lookup("ANTHROPIC_API_KEY")) {
            self.anthropic_api_key = Some(key);
        }
        if let Some(model) = non_empty(lookup("OPENAI_MODEL")) {
            self.openai_model = model;
        }
        if let Some(model) = non_empty(lookup("ANTHROPIC_MODEL")) {
            self.anthropic_model = model;
        }
        if let Some(secs) = lookup("PROVIDER_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            self.provider_timeout_secs = secs;
        }
        if let Some(flag) = lookup("AUTO_GENERATE") {
            self.auto_generate = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(secs) = lookup("AUTO_GENERATE_INTERVAL").and_then(|s| s.trim().parse().ok()) {
            self.auto_generate_interval = secs;
        }
        if let Some(url) = non_empty(lookup("DATABASE_URL")) {
            self.database_url = Some(url);
        }
        if let Some(path) = non_empty(lookup("SQLITE_PATH")) {
            self.sqlite_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("PORT").and_then(|s| s.trim().parse().ok()) {
            self.port = port;
        }
    }

    /// Presence of a connection string selects PostgreSQL.
    pub fn storage_backend(&self) -> StorageBackend {
        match &self.database_url {
            Some(url) => StorageBackend::Postgres(url.clone()),
            None => StorageBackend::Sqlite(self.sqlite_path.clone()),
        }
    }

    /// Credential for the selected provider, if one is configured.
    pub fn active_api_key(&self) -> Option<&str> {
        let key = match self.provider {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn active_model(&self) -> &str {
        match self.provider {
            ProviderKind::OpenAi => &self.openai_model,
            ProviderKind::Anthropic => &self.anthropic_model,
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.auto_generate_interval.max(1))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("perpetual-ideas.toml")
}

/// Read the optional TOML file, then let the environment win.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config = read_config_file(path)?.unwrap_or_default();
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

pub fn read_config_file(path: Option<&Path>) -> anyhow::Result<Option<AppConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
