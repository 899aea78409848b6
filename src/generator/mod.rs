//! Content Generator
//!
//! Asks the configured provider for an invention, seals the completion in the
//! publication envelope and saves it. Nothing is persisted unless the call,
//! the parse and the hashing all succeeded.

pub mod anthropic;
pub mod document;
pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::storage::InventionStore;
use crate::{Error, Result};

pub use anthropic::AnthropicProvider;
pub use document::{FALLBACK_TITLE, extract_title, sha256_hex};
pub use openai::OpenAiProvider;

pub(crate) const TEMPERATURE: f32 = 1.0;
pub(crate) const MAX_TOKENS: u32 = 3000;

/// Remote provider selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl ProviderKind {
    /// Anything other than `anthropic` (case-insensitive) means OpenAI.
    pub fn from_setting(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("anthropic") {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenAi
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn credential_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prompt in, one text completion out
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub(crate) fn transport_error(provider: &'static str, err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::provider(provider, format!("request timed out after {:?}", timeout))
    } else {
        Error::provider(provider, format!("HTTP request failed: {}", err))
    }
}

enum Backend {
    Ready(Box<dyn CompletionProvider>),
    MissingCredential(ProviderKind),
}

pub struct Generator {
    backend: Backend,
    store: Arc<dyn InventionStore>,
    clock: Arc<dyn Clock>,
}

impl Generator {
    /// Resolve the provider once. A missing credential is reported on each
    /// `generate` call rather than here, so the rest of the app still runs.
    pub fn from_config(config: &AppConfig, store: Arc<dyn InventionStore>) -> Result<Self> {
        let backend = match config.active_api_key() {
            None => Backend::MissingCredential(config.provider),
            Some(key) => {
                let provider: Box<dyn CompletionProvider> = match config.provider {
                    ProviderKind::OpenAi => Box::new(OpenAiProvider::new(
                        key,
                        config.active_model(),
                        config.provider_timeout(),
                    )?),
                    ProviderKind::Anthropic => Box::new(AnthropicProvider::new(
                        key,
                        config.active_model(),
                        config.provider_timeout(),
                    )?),
                };
                Backend::Ready(provider)
            }
        };

        Ok(Self {
            backend,
            store,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_provider(provider: Box<dyn CompletionProvider>, store: Arc<dyn InventionStore>) -> Self {
        Self {
            backend: Backend::Ready(provider),
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    pub fn provider_name(&self) -> &'static str {
        match &self.backend {
            Backend::Ready(provider) => provider.name(),
            Backend::MissingCredential(kind) => kind.as_str(),
        }
    }

    fn provider(&self) -> Result<&dyn CompletionProvider> {
        match &self.backend {
            Backend::Ready(provider) => Ok(provider.as_ref()),
            Backend::MissingCredential(kind) => Err(Error::Configuration(format!(
                "{} not set in environment",
                kind.credential_var()
            ))),
        }
    }

    /// Generate, seal and store one invention. Returns its id.
    pub async fn generate(&self, domain_key: &str, domain_name: &str) -> Result<String> {
        let provider = self.provider()?;
        let prompt = prompt::build_prompt(domain_name);

        tracing::debug!(provider = provider.name(), domain = %domain_key, "Requesting invention");
        let raw = provider.complete(&prompt).await?;
        if raw.trim().is_empty() {
            return Err(Error::provider(provider.name(), "empty completion"));
        }

        let missing = prompt::missing_sections(&raw);
        if !missing.is_empty() {
            tracing::warn!(domain = %domain_key, missing = ?missing, "Completion is missing sections");
        }

        let record = document::assemble(&raw, self.clock.now(), domain_key, domain_name);
        self.store.save(&record).await?;

        tracing::info!(
            invention_id = %record.invention_id,
            domain = %domain_key,
            title = %record.title,
            "Invention generated"
        );
        Ok(record.invention_id)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("provider", &self.provider_name())
            .field("configured", &self.is_configured())
            .finish()
    }
}
