use anyhow::Context as _;
use chrono::Utc;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;

use crate::{OutputMode, emit_success};
use perpetual_ideas::config::{self, AppConfig, StorageBackend};
use perpetual_ideas::scheduler::{Scheduler, SchedulerConfig, default_cutoff};
use perpetual_ideas::storage::{self, InventionStore};
use perpetual_ideas::ui::{self, Icons, Spinner, theme};
use perpetual_ideas::{DomainRegistry, Generator, QueryEngine};

/// Loaded settings shared by every command
pub struct Context {
    pub config: AppConfig,
    pub output_mode: OutputMode,
    pub registry: DomainRegistry,
}

impl Context {
    pub fn new(config: AppConfig, output_mode: OutputMode) -> Self {
        Self {
            config,
            output_mode,
            registry: DomainRegistry::builtin(),
        }
    }

    /// Open and initialise the configured store
    async fn store(&self) -> anyhow::Result<Arc<dyn InventionStore>> {
        let store = storage::open_store(&self.config).context("Failed to open the invention store")?;
        store
            .init()
            .await
            .context("Database initialization failed")?;
        Ok(store)
    }

    async fn engine(&self) -> anyhow::Result<QueryEngine> {
        Ok(QueryEngine::new(self.store().await?, self.registry))
    }

    fn is_human(&self) -> bool {
        self.output_mode.is_human()
    }
}

pub async fn run_serve(ctx: &Context, port: Option<u16>, no_scheduler: bool) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let generator = Arc::new(Generator::from_config(&ctx.config, store.clone())?);
    if !generator.is_configured() {
        tracing::warn!(
            provider = generator.provider_name(),
            "No API key for the selected provider; generation requests will fail"
        );
    }

    let mut scheduler_config = SchedulerConfig::from_app_config(&ctx.config);
    if no_scheduler {
        scheduler_config.enabled = false;
    }
    let scheduler = Scheduler::start(scheduler_config, ctx.registry, generator.clone());
    tracing::info!(
        armed = scheduler.is_armed(),
        cutoff = %scheduler.cutoff(),
        "Scheduler started"
    );

    let engine = QueryEngine::new(store, ctx.registry).with_generator(generator);
    let port = port.unwrap_or(ctx.config.port);

    let result = perpetual_ideas::server::start_server(port, engine, shutdown_signal()).await;
    scheduler.shutdown().await;
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_init_db(ctx: &Context) -> anyhow::Result<()> {
    let spinner = Spinner::new("Initializing database...");
    let store = match ctx.store().await {
        Ok(store) => store,
        Err(e) => {
            spinner.fail();
            return Err(e);
        }
    };

    if ctx.is_human() {
        spinner.succeed(&format!("Database ready ({})", store.backend_name()));
        if let StorageBackend::Sqlite(path) = ctx.config.storage_backend() {
            ui::status(Icons::DATABASE, "File", &path.display().to_string());
        }
    } else {
        spinner.clear();
    }
    emit_success(
        ctx.output_mode,
        "init-db",
        serde_json::json!({ "backend": store.backend_name() }),
    )
}

pub async fn run_generate(ctx: &Context, domain_key: &str) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let generator = Arc::new(Generator::from_config(&ctx.config, store.clone())?);
    let engine = QueryEngine::new(store, ctx.registry).with_generator(generator.clone());

    let spinner = Spinner::new(&format!(
        "Asking {} for a {} invention...",
        generator.provider_name(),
        domain_key
    ));
    let invention_id = match engine.generate(domain_key).await {
        Ok(id) => id,
        Err(e) => {
            spinner.fail();
            return Err(e.into());
        }
    };

    let record = engine
        .by_id(domain_key, &invention_id)
        .await?
        .with_context(|| format!("Invention {} was not found after saving", invention_id))?;

    if ctx.is_human() {
        spinner.succeed(&format!("Generated {}", invention_id));
        ui::summary_row("Title:", &record.title);
        ui::summary_row("Domain:", &record.domain_name);
        ui::status(Icons::SEAL, "SHA-256", &record.hash.style(theme().hash.clone()).to_string());
    } else {
        spinner.clear();
    }
    emit_success(
        ctx.output_mode,
        "generate",
        serde_json::json!({
            "invention_id": record.invention_id,
            "domain_key": record.domain_key,
            "title": record.title,
            "hash": record.hash,
        }),
    )
}

pub async fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let engine = ctx.engine().await?;
    let page = engine.stats_page().await?;

    if !ctx.is_human() {
        return emit_success(ctx.output_mode, "stats", serde_json::to_value(&page)?);
    }

    ui::header("Perpetual Ideas Statistics");
    println!("{}", ui::stats_table(&page.stats, engine.store().backend_name()));

    if !page.stats.by_domain.is_empty() {
        ui::section("By domain");
        for (key, info) in engine.registry().list_all() {
            let count = page.stats.count_for(key);
            if count > 0 {
                println!("  {} {}", ui::domain_label(info), count);
            }
        }
    }

    if !page.recent_inventions.is_empty() {
        ui::section("Recent inventions");
        println!("{}", ui::inventions_table(&page.recent_inventions));
    }
    Ok(())
}

pub async fn run_search(ctx: &Context, query: &str) -> anyhow::Result<()> {
    let engine = ctx.engine().await?;
    let hits = engine.search(query).await?;

    if !ctx.is_human() {
        return emit_success(
            ctx.output_mode,
            "search",
            serde_json::json!({ "query": query, "results": hits }),
        );
    }

    ui::status(Icons::SEARCH, "Searching for", &format!("'{}'", query));
    if hits.is_empty() {
        println!("{}", ui::muted("No inventions matched."));
    } else {
        println!("{}", ui::search_table(&hits));
        println!("{}", ui::dim(&format!("{} result(s)", hits.len())));
    }
    Ok(())
}

pub async fn run_list(ctx: &Context, domain: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let engine = ctx.engine().await?;

    let (heading, inventions) = match domain {
        Some(key) => {
            let page = engine.by_domain(key, Some(limit)).await?;
            (ui::domain_label(&page.info), page.inventions)
        }
        None => ("All inventions".to_string(), engine.all(limit).await?),
    };

    if !ctx.is_human() {
        return emit_success(ctx.output_mode, "list", serde_json::to_value(&inventions)?);
    }

    ui::header(&heading);
    if inventions.is_empty() {
        println!("{}", ui::muted("No inventions yet."));
    } else {
        println!("{}", ui::inventions_table(&inventions));
    }
    Ok(())
}

pub async fn run_show(ctx: &Context, domain: &str, id: &str) -> anyhow::Result<()> {
    let engine = ctx.engine().await?;
    let record = engine
        .by_id(domain, id)
        .await?
        .with_context(|| format!("Invention {} not found in {}", id, domain))?;

    if !ctx.is_human() {
        return emit_success(ctx.output_mode, "show", serde_json::to_value(&record)?);
    }

    println!("{}", record.content);
    Ok(())
}

pub async fn run_domains(ctx: &Context) -> anyhow::Result<()> {
    let engine = ctx.engine().await?;
    let domains = engine.domains().await?;

    if !ctx.is_human() {
        return emit_success(ctx.output_mode, "domains", serde_json::to_value(&domains)?);
    }

    println!("{}", ui::domains_table(&domains));
    Ok(())
}

pub async fn run_check(ctx: &Context, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut issues: Vec<String> = Vec::new();
    if ctx.is_human() {
        ui::header("Checking Perpetual Ideas setup...");
        println!();
    }

    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let config_found = config_file.exists();

    let provider = ctx.config.provider;
    let credential = ctx.config.active_api_key().is_some();
    if credential {
        if ctx.is_human() {
            ui::check_pass(&format!("{} API key is set", provider));
        }
    } else {
        issues.push("No valid API key".to_string());
        if ctx.is_human() {
            ui::check_fail(
                &format!("No API key for provider '{}'", provider),
                &format!("Fix: export {}=...", provider.credential_var()),
            );
        }
    }

    let backend = ctx.config.storage_backend();
    let storage_result = match ctx.store().await {
        Ok(store) => store.get_stats().await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    match (&storage_result, &backend) {
        (Ok(stats), _) => {
            if ctx.is_human() {
                ui::check_pass(&format!(
                    "Database connection successful ({} inventions)",
                    stats.total_inventions
                ));
            }
        }
        (Err(e), StorageBackend::Postgres(_)) => {
            issues.push("Cannot connect to database".to_string());
            if ctx.is_human() {
                ui::check_fail(
                    &format!("Cannot connect to database: {:#}", e),
                    "Fix: make sure PostgreSQL is running and DATABASE_URL is correct",
                );
            }
        }
        (Err(e), StorageBackend::Sqlite(path)) => {
            issues.push("Cannot open SQLite file".to_string());
            if ctx.is_human() {
                ui::check_fail(
                    &format!("Cannot open {}: {:#}", path.display(), e),
                    "Fix: check the directory is writable or set SQLITE_PATH",
                );
            }
        }
    }

    let cutoff = default_cutoff();
    let now = Utc::now();
    let scheduler_state = if !ctx.config.auto_generate {
        "disabled".to_string()
    } else if now >= cutoff {
        "past cutoff".to_string()
    } else {
        format!("{} days remaining", (cutoff - now).num_days())
    };

    if !ctx.is_human() {
        return emit_success(
            ctx.output_mode,
            "check",
            serde_json::json!({
                "provider": provider.as_str(),
                "credential": credential,
                "storage": match backend {
                    StorageBackend::Postgres(_) => "postgres",
                    StorageBackend::Sqlite(_) => "sqlite",
                },
                "storage_ok": storage_result.is_ok(),
                "config_file": config_found.then(|| config_file.display().to_string()),
                "auto_generate": scheduler_state,
                "issues": issues,
            }),
        );
    }

    if let StorageBackend::Sqlite(_) = backend {
        ui::warn("Using the embedded SQLite file; set DATABASE_URL for PostgreSQL");
    }
    ui::status(Icons::ROBOT, "Auto-generation", &scheduler_state);
    ui::status(Icons::CALENDAR, "Cutoff", &cutoff.format("%Y-%m-%d %H:%M UTC").to_string());
    ui::status(
        Icons::FILE,
        "Config file",
        &if config_found {
            config_file.display().to_string()
        } else {
            "not found (environment only)".to_string()
        },
    );

    println!();
    println!("{}", "=".repeat(60));
    if issues.is_empty() {
        ui::success("All checks passed! Run: perpetual-ideas serve");
    } else {
        ui::error(&format!("Found {} issue(s) to fix:", issues.len()));
        for (i, issue) in issues.iter().enumerate() {
            println!("   {}. {}", i + 1, issue);
        }
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

/// Write the loaded settings without credentials; keys belong in the environment.
pub fn run_init_config(ctx: &Context, path: &Path, force: bool) -> anyhow::Result<()> {
    let mut config = ctx.config.clone();
    config.openai_api_key = None;
    config.anthropic_api_key = None;
    config.database_url = None;

    config::write_config(path, &config, force)?;

    if ctx.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        ui::status(Icons::KEY, "Credentials", "set OPENAI_API_KEY or ANTHROPIC_API_KEY in the environment");
    }
    emit_success(
        ctx.output_mode,
        "init-config",
        serde_json::json!({ "path": path.display().to_string() }),
    )
}
