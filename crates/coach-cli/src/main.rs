mod config;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use coach_core::auth::{self, Identity};
use coach_core::blob::LocalBlobStore;
use coach_core::extract::UnconfiguredExtractor;
use coach_db::models::Role;
use coach_db::pool;

use config::{CoachConfig, ServerOverrides};

/// Connections for the HTTP server pool.
const SERVER_POOL_SIZE: u32 = 10;

#[derive(Parser)]
#[command(name = "coach", about = "Coaching backend: versioned diet and workout plans")]
struct Cli {
    /// Database URL (overrides COACH_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a coach config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/coach")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the coach database
    DbInit,
    /// Bearer token management
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Directory evidence uploads are written to
        #[arg(long)]
        uploads_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Mint a bearer token for a user
    Issue {
        /// User ID the token is for
        #[arg(long)]
        user: Uuid,
        /// Role: client, trainer or gym_owner
        #[arg(long)]
        role: Role,
    },
}

/// Execute `coach init`: write the config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
        server: config::ServerSection::default(),
    };
    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    println!();
    println!("Next: run `coach db-init` to create and migrate the database.");

    Ok(())
}

/// Execute `coach db-init`: create the database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = CoachConfig::resolve(cli_db_url)?;

    println!("Initializing coach database...");
    if pool::ensure_database(&resolved.db_config).await? {
        println!("Created database.");
    }

    let db_pool = pool::create_pool(&resolved.db_config, 2).await?;
    pool::run_migrations(&db_pool).await?;

    let summary = pool::schema_summary(&db_pool).await?;
    println!("Database ready.");
    println!("{summary}");

    db_pool.close().await;
    println!("coach db-init complete.");
    Ok(())
}

fn cmd_token_issue(cli_db_url: Option<&str>, user: Uuid, role: Role) -> anyhow::Result<()> {
    let resolved = CoachConfig::resolve(cli_db_url)?;
    let token = auth::issue_token(&resolved.token_config, &Identity { user_id: user, role })
        .context("failed to issue token")?;
    println!("{token}");
    Ok(())
}

async fn cmd_serve(cli_db_url: Option<&str>, overrides: ServerOverrides) -> anyhow::Result<()> {
    let resolved = CoachConfig::resolve_with(cli_db_url, overrides)?;
    let db_pool = pool::create_pool(&resolved.db_config, SERVER_POOL_SIZE).await?;

    let state = serve::AppState {
        pool: db_pool.clone(),
        tokens: Arc::new(resolved.token_config),
        blobs: Arc::new(LocalBlobStore::new(&resolved.server.uploads_dir)),
        extractor: Arc::new(UnconfiguredExtractor),
    };
    let result = serve::run_serve(
        state,
        &resolved.server.bind,
        resolved.server.port,
        &resolved.server.uploads_dir,
    )
    .await;

    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_url = cli.database_url.as_deref();

    match cli.command {
        Commands::Init { db_url, force } => cmd_init(&db_url, force)?,
        Commands::DbInit => cmd_db_init(db_url).await?,
        Commands::Token {
            command: TokenCommands::Issue { user, role },
        } => cmd_token_issue(db_url, user, role)?,
        Commands::Serve {
            bind,
            port,
            uploads_dir,
        } => {
            cmd_serve(
                db_url,
                ServerOverrides {
                    bind,
                    port,
                    uploads_dir,
                },
            )
            .await?
        }
    }

    Ok(())
}
