//! Database query functions for the `*_templates` tables. Template items
//! go through [`super::list_items`], [`super::delete_items`] and the
//! kind-specific insert functions.

use anyhow::{Context, Result};
use sqlx::PgConnection;
use uuid::Uuid;

use super::PlanTables;
use crate::models::{Template, TemplateSummary};

/// Insert a template row owned by `trainer_id`.
pub async fn insert_template(
    conn: &mut PgConnection,
    tables: &PlanTables,
    trainer_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Template> {
    let sql = format!(
        "INSERT INTO {} (trainer_id, name, description) VALUES ($1, $2, $3) RETURNING *",
        tables.templates
    );
    let template = sqlx::query_as::<_, Template>(&sql)
        .bind(trainer_id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to insert into {}", tables.templates))?;

    Ok(template)
}

/// Rename / re-describe a template. Returns `None` when the template does
/// not exist or belongs to another trainer.
pub async fn update_template(
    conn: &mut PgConnection,
    tables: &PlanTables,
    trainer_id: Uuid,
    template_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Option<Template>> {
    let sql = format!(
        "UPDATE {} SET name = $1, description = $2, updated_at = now() \
         WHERE id = $3 AND trainer_id = $4 \
         RETURNING *",
        tables.templates
    );
    let template = sqlx::query_as::<_, Template>(&sql)
        .bind(name)
        .bind(description)
        .bind(template_id)
        .bind(trainer_id)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("failed to update {}", tables.templates))?;

    Ok(template)
}

/// Fetch a template owned by `trainer_id`.
pub async fn get_template(
    conn: &mut PgConnection,
    tables: &PlanTables,
    trainer_id: Uuid,
    template_id: Uuid,
) -> Result<Option<Template>> {
    let sql = format!(
        "SELECT * FROM {} WHERE id = $1 AND trainer_id = $2",
        tables.templates
    );
    let template = sqlx::query_as::<_, Template>(&sql)
        .bind(template_id)
        .bind(trainer_id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to fetch template")?;

    Ok(template)
}

/// List a trainer's templates with item counts, newest first.
pub async fn list_templates(
    conn: &mut PgConnection,
    tables: &PlanTables,
    trainer_id: Uuid,
) -> Result<Vec<TemplateSummary>> {
    let sql = format!(
        "SELECT t.*, \
                (SELECT COUNT(*) FROM {items} i WHERE i.template_id = t.id) AS item_count \
         FROM {templates} t \
         WHERE t.trainer_id = $1 \
         ORDER BY t.created_at DESC",
        items = tables.template_items,
        templates = tables.templates,
    );
    let rows = sqlx::query_as::<_, TemplateSummary>(&sql)
        .bind(trainer_id)
        .fetch_all(&mut *conn)
        .await
        .context("failed to list templates")?;

    Ok(rows)
}

/// Delete a template owned by `trainer_id`; items cascade. Returns whether a
/// row was deleted.
pub async fn delete_template(
    conn: &mut PgConnection,
    tables: &PlanTables,
    trainer_id: Uuid,
    template_id: Uuid,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE id = $1 AND trainer_id = $2",
        tables.templates
    );
    let result = sqlx::query(&sql)
        .bind(template_id)
        .bind(trainer_id)
        .execute(&mut *conn)
        .await
        .context("failed to delete template")?;

    Ok(result.rows_affected() > 0)
}
