//! Perpetual Ideas CLI - generate, browse and serve hashed invention disclosures

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

#[derive(Parser)]
#[command(name = "perpetual-ideas")]
#[command(version)]
#[command(about = "Perpetual Ideas Machine - scheduled invention disclosures with integrity hashes")]
#[command(long_about = r#"
Perpetual Ideas asks a generative-text provider for structured invention
disclosures, seals each one with a SHA-256 digest and keeps them searchable:
  • Scheduled generation across ten technical domains
  • PostgreSQL (DATABASE_URL) or an embedded SQLite file
  • JSON API for browsing, search and manual generation

Example usage:
  perpetual-ideas serve --port 5000
  perpetual-ideas generate --domain materials-science
  perpetual-ideas search --query "polymer"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./perpetual-ideas.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the auto-generation scheduler
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not start the scheduler
        #[arg(long)]
        no_scheduler: bool,
    },

    /// Create the inventions table and indexes
    InitDb,

    /// Generate one invention now
    Generate {
        /// Domain key, e.g. materials-science
        #[arg(short, long)]
        domain: String,
    },

    /// Show archive statistics
    Stats,

    /// Search titles and content (case-insensitive)
    Search {
        /// Search query
        #[arg(short, long)]
        query: String,
    },

    /// List inventions, newest first
    List {
        /// Restrict to one domain
        #[arg(short, long)]
        domain: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Print one invention document
    Show {
        /// Domain key
        #[arg(short, long)]
        domain: String,

        /// Invention id, e.g. inv-20250601-083000
        #[arg(short, long)]
        id: String,
    },

    /// List the registered domains
    Domains,

    /// Check provider credentials and storage connectivity
    Check,

    /// Write a config file with the current settings
    InitConfig {
        /// Where to write (defaults to ./perpetual-ideas.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print `{"ok": true, "command": ..., "data": ...}` on stdout
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config_path = cli.config.as_deref();

    let config = perpetual_ideas::config::load_config(config_path)?;
    let ctx = commands::Context::new(config, output_mode);

    match cli.command {
        Commands::Serve { port, no_scheduler } => commands::run_serve(&ctx, port, no_scheduler).await,
        Commands::InitDb => commands::run_init_db(&ctx).await,
        Commands::Generate { domain } => commands::run_generate(&ctx, &domain).await,
        Commands::Stats => commands::run_stats(&ctx).await,
        Commands::Search { query } => commands::run_search(&ctx, &query).await,
        Commands::List { domain, limit } => commands::run_list(&ctx, domain.as_deref(), limit).await,
        Commands::Show { domain, id } => commands::run_show(&ctx, &domain, &id).await,
        Commands::Domains => commands::run_domains(&ctx).await,
        Commands::Check => commands::run_check(&ctx, config_path).await,
        Commands::InitConfig { path, force } => {
            let path = path
                .or_else(|| cli.config.clone())
                .unwrap_or_else(perpetual_ideas::config::default_config_path);
            commands::run_init_config(&ctx, &path, force)
        }
    }
}
