//! Database query functions for the `users` table: client accounts, their
//! trainer relationship and session credits.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Role, User};

/// SQL form of the derived "Active" client status.
const ACTIVE_PREDICATE: &str = "((total_sessions - completed_sessions) > 0 \
     AND (validity_expires_at IS NULL OR validity_expires_at > now()))";

/// Fields for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub trainer_id: Option<Uuid>,
    pub total_sessions: i32,
    pub validity_expires_at: Option<DateTime<Utc>>,
}

/// Insert a user row.
pub async fn insert_user(conn: &mut PgConnection, new: &NewUser<'_>) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, role, trainer_id, total_sessions, validity_expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.email)
    .bind(new.name)
    .bind(new.role)
    .bind(new.trainer_id)
    .bind(new.total_sessions)
    .bind(new.validity_expires_at)
    .fetch_one(&mut *conn)
    .await
    .context("failed to insert user")?;

    Ok(user)
}

/// Fetch a user by id.
pub async fn get_user(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Whether any account already uses `email`.
pub async fn email_exists(conn: &mut PgConnection, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(&mut *conn)
        .await
        .context("failed to check email")?;

    Ok(exists)
}

/// Fetch a client only if it belongs to `trainer_id`.
pub async fn get_client_for_trainer(
    conn: &mut PgConnection,
    trainer_id: Uuid,
    client_id: Uuid,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND trainer_id = $2 AND role = 'client'",
    )
    .bind(client_id)
    .bind(trainer_id)
    .fetch_optional(&mut *conn)
    .await
    .context("failed to fetch client")?;

    Ok(user)
}

/// Take a row lock on a trainer's client for the rest of the transaction.
///
/// Serializes plan-version writers for the same client. Returns `false` when
/// the client does not exist or belongs to another trainer.
pub async fn lock_client_for_trainer(
    conn: &mut PgConnection,
    trainer_id: Uuid,
    client_id: Uuid,
) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM users WHERE id = $1 AND trainer_id = $2 AND role = 'client' FOR UPDATE",
    )
    .bind(client_id)
    .bind(trainer_id)
    .fetch_optional(&mut *conn)
    .await
    .context("failed to lock client row")?;

    Ok(row.is_some())
}

/// Consume one session credit.
///
/// Single conditional UPDATE: only applies while credits remain. Returns
/// `(completed, total)` after the increment, or `None` when the client is
/// not the trainer's or has no credits left.
pub async fn increment_completed_sessions(
    conn: &mut PgConnection,
    trainer_id: Uuid,
    client_id: Uuid,
) -> Result<Option<(i32, i32)>> {
    let row: Option<(i32, i32)> = sqlx::query_as(
        "UPDATE users SET completed_sessions = completed_sessions + 1 \
         WHERE id = $1 AND trainer_id = $2 AND role = 'client' \
           AND completed_sessions < total_sessions \
         RETURNING completed_sessions, total_sessions",
    )
    .bind(client_id)
    .bind(trainer_id)
    .fetch_optional(&mut *conn)
    .await
    .context("failed to increment completed sessions")?;

    Ok(row)
}

// -----------------------------------------------------------------------
// Client listing
// -----------------------------------------------------------------------

/// Status filter for [`list_clients`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Active,
    Inactive,
    All,
}

/// Ordering for [`list_clients`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSort {
    /// Newest accounts first.
    #[default]
    Recent,
    /// Active clients first, then by name.
    Active,
}

/// Optional predicates for listing a trainer's clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientQuery {
    pub search: Option<String>,
    pub filter: StatusFilter,
    pub sort: ClientSort,
}

/// Escape LIKE wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Build the listing query. Every value is a bound parameter.
fn build_client_query(trainer_id: Uuid, query: &ClientQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT * FROM users WHERE role = 'client' AND trainer_id = ",
    );
    qb.push_bind(trainer_id);

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    match query.filter {
        StatusFilter::Active => {
            qb.push(" AND ").push(ACTIVE_PREDICATE);
        }
        StatusFilter::Inactive => {
            qb.push(" AND NOT ").push(ACTIVE_PREDICATE);
        }
        StatusFilter::All => {}
    }

    match query.sort {
        ClientSort::Recent => {
            qb.push(" ORDER BY created_at DESC");
        }
        ClientSort::Active => {
            qb.push(" ORDER BY (CASE WHEN ")
                .push(ACTIVE_PREDICATE)
                .push(" THEN 0 ELSE 1 END), name ASC");
        }
    }

    qb
}

/// List a trainer's clients according to `query`.
pub async fn list_clients(
    conn: &mut PgConnection,
    trainer_id: Uuid,
    query: &ClientQuery,
) -> Result<Vec<User>> {
    let mut qb = build_client_query(trainer_id, query);
    let users = qb
        .build_query_as::<User>()
        .fetch_all(&mut *conn)
        .await
        .context("failed to list clients")?;

    Ok(users)
}
