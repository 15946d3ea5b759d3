use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::info;

use crate::config::DbConfig;
use crate::queries::{DIET_TABLES, PlanTables, WORKOUT_TABLES};

/// Migrations embedded at compile time from `crates/coach-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

pub async fn create_pool(config: &DbConfig, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply every pending embedded migration.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// Quote `name` as a PostgreSQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the configured database through the `postgres` maintenance
/// database if it is missing. Returns whether it was created.
pub async fn ensure_database(config: &DbConfig) -> Result<bool> {
    let name = config
        .database_name()
        .context("database URL names no database")?;
    let maintenance_url = config.maintenance_url();
    let mut conn = PgConnection::connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&mut conn)
            .await
            .context("failed to look up database")?;

    if !exists {
        // CREATE DATABASE takes no bind parameters.
        (&mut conn)
            .execute(format!("CREATE DATABASE {}", quote_identifier(name)).as_str())
            .await
            .with_context(|| format!("failed to create database {name}"))?;
        info!(db = name, "database created");
    }

    conn.close().await.context("failed to close maintenance connection")?;
    Ok(!exists)
}

/// Row counts for one plan kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyCounts {
    pub versions: i64,
    pub open_versions: i64,
    pub items: i64,
    pub completions: i64,
    pub templates: i64,
}

/// What `coach db-init` reports once the schema is in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    pub clients: i64,
    pub staff: i64,
    pub diet: FamilyCounts,
    pub workout: FamilyCounts,
    pub meal_logs: i64,
}

impl fmt::Display for FamilyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} versions ({} open), {} items, {} completions, {} templates",
            self.versions, self.open_versions, self.items, self.completions, self.templates
        )
    }
}

impl fmt::Display for SchemaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "users:     {} clients, {} staff", self.clients, self.staff)?;
        writeln!(f, "diet:      {}", self.diet)?;
        writeln!(f, "workout:   {}", self.workout)?;
        write!(f, "meal logs: {}", self.meal_logs)
    }
}

async fn family_counts(pool: &PgPool, tables: &PlanTables) -> Result<FamilyCounts> {
    let sql = format!(
        "SELECT (SELECT COUNT(*) FROM {v}), \
                (SELECT COUNT(*) FROM {v} WHERE followed_till IS NULL), \
                (SELECT COUNT(*) FROM {i}), \
                (SELECT COUNT(*) FROM {c}), \
                (SELECT COUNT(*) FROM {t})",
        v = tables.versions,
        i = tables.items,
        c = tables.completions,
        t = tables.templates,
    );
    let (versions, open_versions, items, completions, templates): (i64, i64, i64, i64, i64) =
        sqlx::query_as(&sql)
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count {} rows", tables.versions))?;

    Ok(FamilyCounts {
        versions,
        open_versions,
        items,
        completions,
        templates,
    })
}

/// Count accounts, both plan families and the meal log.
pub async fn schema_summary(pool: &PgPool) -> Result<SchemaSummary> {
    let (clients, staff, meal_logs): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*) FILTER (WHERE role = 'client'), \
                COUNT(*) FILTER (WHERE role <> 'client'), \
                (SELECT COUNT(*) FROM meal_logs) \
         FROM users",
    )
    .fetch_one(pool)
    .await
    .context("failed to count users")?;

    Ok(SchemaSummary {
        clients,
        staff,
        diet: family_counts(pool, &DIET_TABLES).await?,
        workout: family_counts(pool, &WORKOUT_TABLES).await?,
        meal_logs,
    })
}
