//! Shared fixtures for coach integration tests.
//!
//! One PostgreSQL server backs every test in a binary; each test creates its
//! own throwaway database on it.
//!
//! - With **`COACH_TEST_PG_URL`** set, that server is used as-is.
//! - Otherwise a container is started through testcontainers on first use
//!   and kept alive in a `OnceCell` until the process exits.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use coach_db::models::{Role, User};
use coach_db::pool;
use coach_db::queries::clients::{self, NewUser};

/// Environment variable naming an already-running server.
pub const PG_URL_ENV: &str = "COACH_TEST_PG_URL";

struct SharedPg {
    base_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var(PG_URL_ENV) {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL (no database path).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a fresh, migrated database. Returns `(pool, db_name)`; pass the
/// name to [`drop_test_db`] when done.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;
    let db_name = format!("coach_test_{}", Uuid::new_v4().simple());
    maint_pool
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a database created by [`create_test_db`], terminating any
/// connections still open on it.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;
    let _ = maint_pool
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint_pool.close().await;
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.test", Uuid::new_v4().simple())
}

/// Insert a trainer account.
pub async fn insert_trainer(pool: &PgPool, name: &str) -> User {
    let email = unique_email("trainer");
    let mut conn = pool.acquire().await.expect("acquire connection");
    clients::insert_user(
        &mut conn,
        &NewUser {
            email: &email,
            name,
            role: Role::Trainer,
            trainer_id: None,
            total_sessions: 0,
            validity_expires_at: None,
        },
    )
    .await
    .expect("insert trainer")
}

/// Insert a client of `trainer_id` with `total_sessions` credits.
pub async fn insert_client(pool: &PgPool, trainer_id: Uuid, name: &str, total_sessions: i32) -> User {
    insert_client_expiring(pool, trainer_id, name, total_sessions, None).await
}

/// Insert a client with an explicit entitlement expiry.
pub async fn insert_client_expiring(
    pool: &PgPool,
    trainer_id: Uuid,
    name: &str,
    total_sessions: i32,
    validity_expires_at: Option<DateTime<Utc>>,
) -> User {
    let email = unique_email("client");
    let mut conn = pool.acquire().await.expect("acquire connection");
    clients::insert_user(
        &mut conn,
        &NewUser {
            email: &email,
            name,
            role: Role::Client,
            trainer_id: Some(trainer_id),
            total_sessions,
            validity_expires_at,
        },
    )
    .await
    .expect("insert client")
}

/// Overwrite a client's consumed session count.
pub async fn set_completed_sessions(pool: &PgPool, client_id: Uuid, completed: i32) {
    sqlx::query("UPDATE users SET completed_sessions = $1 WHERE id = $2")
        .bind(completed)
        .bind(client_id)
        .execute(pool)
        .await
        .expect("update completed sessions");
}
