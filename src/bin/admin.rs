//! CLI administration tool for codeshort.
//!
//! Runs the same maintenance operations as the `/admin` HTTP endpoints,
//! directly against PostgreSQL and Redis.
//!
//! # Usage
//!
//! ```bash
//! # Flush every pending hit counter to the database
//! cargo run --bin admin -- counters sync
//!
//! # Show Redis statistics
//! cargo run --bin admin -- cache stats
//!
//! # Drop cached short link views
//! cargo run --bin admin -- cache clear url:
//!
//! # Resource counts per kind
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Generate a value for ADMIN_TOKEN
//! cargo run --bin admin -- token generate
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `codeshort::config`). Cache and counter commands
//! require Redis to be configured.

use codeshort::application::services::SystemClock;
use codeshort::config::{self, Config};
use codeshort::domain::repositories::ResourceRepository;
use codeshort::infrastructure::cache::{FastStore, RedisStore};
use codeshort::infrastructure::persistence::PgResourceRepository;
use codeshort::infrastructure::title_fetcher::NoopTitleFetcher;
use codeshort::server::{Assembly, assemble};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// CLI tool for managing codeshort.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Hit counter maintenance
    Counters {
        #[command(subcommand)]
        action: CountersAction,
    },

    /// Fast store maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show resource counts per kind
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Admin token helpers
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum CountersAction {
    /// Flush every pending counter to the database
    Sync,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show fast store statistics
    Stats,

    /// Delete cached entries under a key prefix (e.g. `url:`)
    Clear {
        prefix: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print a random token suitable for ADMIN_TOKEN
    Generate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Token { action } = &cli.command {
        return handle_token_action(action);
    }

    let config = config::load_from_env().context("Invalid configuration")?;

    // Lazy so cache commands work while the database is down.
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect_lazy(&config.database_url)
        .context("Invalid DATABASE_URL")?;

    match cli.command {
        Commands::Counters { action } => handle_counters_action(action, &config, &pool).await?,
        Commands::Cache { action } => handle_cache_action(action, &config, &pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
        Commands::Token { .. } => {}
    }

    Ok(())
}

/// Wires the service graph on Redis and the given pool.
async fn connect(config: &Config, pool: &PgPool) -> Result<Assembly> {
    let redis_url = config
        .redis_url
        .as_deref()
        .context("Redis is not configured (set REDIS_URL or REDIS_HOST)")?;

    let store: Arc<dyn FastStore> = Arc::new(
        RedisStore::connect(redis_url, config.fast_store_timeout())
            .await
            .context("Failed to connect to Redis")?,
    );
    let repository: Arc<dyn ResourceRepository> =
        Arc::new(PgResourceRepository::new(Arc::new(pool.clone())));

    Ok(assemble(
        config,
        repository,
        store,
        Arc::new(NoopTitleFetcher),
        Arc::new(SystemClock),
    ))
}

async fn handle_counters_action(
    action: CountersAction,
    config: &Config,
    pool: &PgPool,
) -> Result<()> {
    match action {
        CountersAction::Sync => {
            println!("{}", "🔄 Syncing pending counters".bright_blue().bold());
            println!();

            let assembly = connect(config, pool).await?;
            let report = assembly
                .counters
                .force_sync_all()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to sync counters: {}", e))?;

            println!(
                "  Scanned:        {}",
                report.scanned.to_string().bright_white()
            );
            println!(
                "  Flushed keys:   {}",
                report.flushed_keys.to_string().bright_green().bold()
            );
            println!(
                "  Flushed hits:   {}",
                report.flushed_hits.to_string().bright_green().bold()
            );
            if report.restored_hits > 0 {
                println!(
                    "  Restored hits:  {}",
                    report.restored_hits.to_string().yellow().bold()
                );
            }
            if report.lost_hits > 0 {
                println!(
                    "  Lost hits:      {}",
                    report.lost_hits.to_string().red().bold()
                );
            }
            if report.skipped_keys > 0 {
                println!(
                    "  Skipped keys:   {}",
                    report.skipped_keys.to_string().bright_black()
                );
            }
            println!();

            if report.restored_hits > 0 || report.lost_hits > 0 {
                println!(
                    "{}",
                    "⚠️  Some counters could not be written; run sync again later".yellow()
                );
            } else {
                println!("{}", "✅ Counters synced".green().bold());
            }
        }
    }

    Ok(())
}

async fn handle_cache_action(action: CacheAction, config: &Config, pool: &PgPool) -> Result<()> {
    let assembly = connect(config, pool).await?;
    let service = assembly.state.resource_service;

    match action {
        CacheAction::Stats => {
            println!("{}", "📊 Fast store statistics".bright_blue().bold());
            println!();

            let stats = service
                .cache_stats()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            println!("  Backend:       {}", stats.backend.cyan());
            println!(
                "  Keys:          {}",
                stats.total_keys.to_string().bright_green().bold()
            );
            if let Some(mem) = &stats.used_memory_human {
                println!("  Memory:        {}", mem.bright_white());
            }
            if let Some(clients) = stats.connected_clients {
                println!("  Clients:       {}", clients.to_string().bright_white());
            }
            if let Some(uptime) = stats.uptime_in_seconds {
                println!("  Uptime:        {}s", uptime.to_string().bright_white());
            }
            println!(
                "  Hit rate:      {} ({} hits / {} misses)",
                format!("{:.1}%", stats.hit_rate * 100.0).bright_green().bold(),
                stats.keyspace_hits,
                stats.keyspace_misses
            );
            println!();
        }
        CacheAction::Clear { prefix, yes } => {
            println!("{}", "🧹 Clear cache prefix".bright_blue().bold());
            println!();
            println!("  Prefix: {}", prefix.cyan());
            println!();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Delete every key under this prefix?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("{}", "❌ Cancelled".red());
                    return Ok(());
                }
            }

            let removed = service
                .clear_cache_prefix(&prefix)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            println!(
                "{} {}",
                "✅ Removed keys:".green().bold(),
                removed.to_string().bright_white().bold()
            );
        }
    }

    Ok(())
}

/// Displays resource counts and durable hit totals per kind.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT kind, COUNT(*), COALESCE(SUM(hits), 0)::BIGINT FROM resources GROUP BY kind ORDER BY kind",
    )
    .fetch_all(pool)
    .await
    .context("Failed to query resources")?;

    if rows.is_empty() {
        println!("{}", "  No resources yet".yellow());
        println!();
        return Ok(());
    }

    println!(
        "  {:<10} {:>12} {:>14}",
        "Kind".bright_white().bold(),
        "Resources".bright_white().bold(),
        "Durable hits".bright_white().bold()
    );
    println!("  {}", "─".repeat(38).bright_black());

    for (kind, count, hits) in &rows {
        println!(
            "  {:<10} {:>12} {:>14}",
            kind.cyan(),
            count.to_string().bright_green(),
            hits.to_string().bright_green()
        );
    }

    println!();
    println!(
        "  {}",
        "Pending hits not yet synced are excluded".bright_black()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1")
                .fetch_one(pool)
                .await
                .context("Database connection failed")?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}

fn handle_token_action(action: &TokenAction) -> Result<()> {
    match action {
        TokenAction::Generate => {
            let token = generate_token();

            println!("{}", "🔑 Admin token".bright_blue().bold());
            println!();
            println!("  {}", token.bright_yellow().bold());
            println!();
            println!("{}", "Add this to the server environment:".bright_white());
            println!("  {}={}", "ADMIN_TOKEN".bright_cyan(), token.bright_yellow());
            println!();
        }
    }

    Ok(())
}

/// Generates a cryptographically random token.
///
/// # Format
///
/// - Length: 48 characters
/// - Character set: A-Z, a-z, 0-9
fn generate_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LEN: usize = 48;

    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
