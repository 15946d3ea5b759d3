//! Database query functions for the `*_plan_versions` tables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use super::PlanTables;
use crate::models::{PlanVersion, VersionSummary};

/// Fields for a new version row.
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub client_id: Uuid,
    pub created_by_trainer_id: Option<Uuid>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub followed_from: NaiveDate,
    pub followed_till: Option<NaiveDate>,
}

/// Insert a version row. Returns it with server-generated defaults.
pub async fn insert_version(
    conn: &mut PgConnection,
    tables: &PlanTables,
    new: &NewVersion<'_>,
) -> Result<PlanVersion> {
    let sql = format!(
        "INSERT INTO {} (client_id, created_by_trainer_id, title, description, followed_from, followed_till) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
        tables.versions
    );
    let version = sqlx::query_as::<_, PlanVersion>(&sql)
        .bind(new.client_id)
        .bind(new.created_by_trainer_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.followed_from)
        .bind(new.followed_till)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to insert into {}", tables.versions))?;

    Ok(version)
}

/// Close every open version of a client by setting `followed_till = on`.
///
/// Returns how many versions were closed.
pub async fn close_open_versions(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    on: NaiveDate,
) -> Result<u64> {
    let sql = format!(
        "UPDATE {} SET followed_till = $1, updated_at = now() \
         WHERE client_id = $2 AND followed_till IS NULL",
        tables.versions
    );
    let result = sqlx::query(&sql)
        .bind(on)
        .bind(client_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to close open versions in {}", tables.versions))?;

    Ok(result.rows_affected())
}

/// Fetch the open version of a client, if any.
pub async fn get_open_version(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
) -> Result<Option<PlanVersion>> {
    let sql = format!(
        "SELECT * FROM {} WHERE client_id = $1 AND followed_till IS NULL \
         ORDER BY created_at DESC LIMIT 1",
        tables.versions
    );
    let version = sqlx::query_as::<_, PlanVersion>(&sql)
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to fetch open version")?;

    Ok(version)
}

/// Fetch a version by id, scoped to its owning client.
pub async fn get_version_for_client(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    version_id: Uuid,
) -> Result<Option<PlanVersion>> {
    let sql = format!(
        "SELECT * FROM {} WHERE id = $1 AND client_id = $2",
        tables.versions
    );
    let version = sqlx::query_as::<_, PlanVersion>(&sql)
        .bind(version_id)
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to fetch version")?;

    Ok(version)
}

/// List a client's version history, newest `followed_from` first.
pub async fn list_version_summaries(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
) -> Result<Vec<VersionSummary>> {
    let sql = format!(
        "SELECT id, title, followed_from, followed_till, \
                (followed_till IS NULL) AS is_current \
         FROM {} WHERE client_id = $1 \
         ORDER BY followed_from DESC, created_at DESC",
        tables.versions
    );
    let rows = sqlx::query_as::<_, VersionSummary>(&sql)
        .bind(client_id)
        .fetch_all(&mut *conn)
        .await
        .context("failed to list version history")?;

    Ok(rows)
}

/// List every version whose effective range intersects `[from, to]`.
///
/// Ordered so that the first version covering any given date is the one
/// that date resolves to: latest `followed_from` first, then latest created.
pub async fn list_versions_overlapping(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<PlanVersion>> {
    let sql = format!(
        "SELECT * FROM {} \
         WHERE client_id = $1 \
           AND followed_from <= $3 \
           AND (followed_till IS NULL OR followed_till >= $2) \
         ORDER BY followed_from DESC, created_at DESC",
        tables.versions
    );
    let rows = sqlx::query_as::<_, PlanVersion>(&sql)
        .bind(client_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await
        .context("failed to list versions in range")?;

    Ok(rows)
}

/// Count the open versions of a client. Never more than one when the
/// schema's partial unique index is in place.
pub async fn count_open_versions(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE client_id = $1 AND followed_till IS NULL",
        tables.versions
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(client_id)
        .fetch_one(&mut *conn)
        .await
        .context("failed to count open versions")?;

    Ok(count)
}
