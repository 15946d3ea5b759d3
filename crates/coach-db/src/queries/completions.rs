//! Database query functions for the `*_completions` tables.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use super::PlanTables;
use crate::models::Completion;

/// Insert a completion, or overwrite the evidence and timestamp of the
/// existing one for the same `(client, item, date)`.
///
/// One statement, so concurrent marks for the same key cannot duplicate.
pub async fn upsert_completion(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    item_id: Uuid,
    date: NaiveDate,
    evidence_url: Option<&str>,
) -> Result<Completion> {
    let sql = format!(
        "INSERT INTO {} (client_id, item_id, date, evidence_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (client_id, item_id, date) \
         DO UPDATE SET evidence_url = EXCLUDED.evidence_url, completed_at = now() \
         RETURNING *",
        tables.completions
    );
    let completion = sqlx::query_as::<_, Completion>(&sql)
        .bind(client_id)
        .bind(item_id)
        .bind(date)
        .bind(evidence_url)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to upsert into {}", tables.completions))?;

    Ok(completion)
}

/// Delete the completion for `(client, item, date)`. Returns rows removed
/// (0 when nothing was marked).
pub async fn delete_completion(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    item_id: Uuid,
    date: NaiveDate,
) -> Result<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE client_id = $1 AND item_id = $2 AND date = $3",
        tables.completions
    );
    let result = sqlx::query(&sql)
        .bind(client_id)
        .bind(item_id)
        .bind(date)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to delete from {}", tables.completions))?;

    Ok(result.rows_affected())
}

/// List a client's completions with dates in `[from, to]`.
pub async fn list_completions_between(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Completion>> {
    let sql = format!(
        "SELECT * FROM {} WHERE client_id = $1 AND date BETWEEN $2 AND $3",
        tables.completions
    );
    let rows = sqlx::query_as::<_, Completion>(&sql)
        .bind(client_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await
        .context("failed to list completions")?;

    Ok(rows)
}

/// Count completion rows for one key.
pub async fn count_completions(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    item_id: Uuid,
    date: NaiveDate,
) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE client_id = $1 AND item_id = $2 AND date = $3",
        tables.completions
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(client_id)
        .bind(item_id)
        .bind(date)
        .fetch_one(&mut *conn)
        .await
        .context("failed to count completions")?;

    Ok(count)
}
