//! linkstash-migrate: apply, revert, and inspect schema migrations.
//!
//! Uses the migrations embedded in `linkstash-db` unless `--path` points at a
//! directory of sqlx migration files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linkstash_db::{create_pool, migrator, PoolConfig};

#[derive(Parser)]
#[command(name = "linkstash-migrate")]
#[command(author, version, about = "Schema migrations for linkstash")]
#[command(propagate_version = true)]
struct Cli {
    /// Database URL (defaults to DATABASE_URL)
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// Directory of migration files (defaults to the embedded set)
    #[arg(short, long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Up,

    /// Revert the most recent migrations
    Down {
        /// Number of migrations to revert
        #[arg(short, long, default_value_t = 1)]
        steps: usize,
    },

    /// Print the current schema version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let migrations = match &cli.path {
        Some(path) => Migrator::new(path.as_path())
            .await
            .with_context(|| format!("loading migrations from {}", path.display()))?,
        None => migrator(),
    };

    let pool = create_pool(&cli.database, &PoolConfig::new().max_connections(1))
        .await
        .context("connecting to database")?;

    match cli.command {
        Commands::Up => {
            migrations.run(&pool).await.context("applying migrations")?;
            let version = current_version(&pool).await?;
            info!(version = ?version, "Migrations applied");
        }
        Commands::Down { steps } => {
            let applied = applied_versions(&pool).await?;
            // Revert everything newer than the version `steps` places down.
            let target = applied.get(steps).copied().unwrap_or(0);
            migrations
                .undo(&pool, target)
                .await
                .context("reverting migrations")?;
            info!(steps, target, "Migrations reverted");
        }
        Commands::Version => match current_version(&pool).await? {
            Some(version) => println!("{}", version),
            None => println!("no migrations applied"),
        },
    }

    Ok(())
}

/// Successfully applied versions, newest first.
async fn applied_versions(pool: &PgPool) -> anyhow::Result<Vec<i64>> {
    let table_exists: bool =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !table_exists {
        return Ok(Vec::new());
    }

    let versions = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success ORDER BY version DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(versions)
}

async fn current_version(pool: &PgPool) -> anyhow::Result<Option<i64>> {
    Ok(applied_versions(pool).await?.first().copied())
}
