//! Database query functions.
//!
//! Every function takes the connection it runs on (`&mut PgConnection`), so
//! callers decide whether it executes inside a transaction.
//!
//! Diet and workout plans share one table layout, so the version,
//! completion and template queries are written once and pointed at a
//! [`PlanTables`] set. Table names are compile-time constants and never come
//! from user input.

pub mod clients;
pub mod completions;
pub mod exercises;
pub mod meal_logs;
pub mod meals;
pub mod templates;
pub mod versions;

use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

/// The tables backing one plan kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTables {
    pub versions: &'static str,
    pub items: &'static str,
    pub completions: &'static str,
    pub templates: &'static str,
    pub template_items: &'static str,
}

pub const DIET_TABLES: PlanTables = PlanTables {
    versions: "diet_plan_versions",
    items: "diet_plan_meals",
    completions: "diet_completions",
    templates: "diet_templates",
    template_items: "diet_template_meals",
};

pub const WORKOUT_TABLES: PlanTables = PlanTables {
    versions: "workout_plan_versions",
    items: "workout_plan_exercises",
    completions: "workout_completions",
    templates: "workout_templates",
    template_items: "workout_template_exercises",
};

/// Which parent a batch of line items hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOwner {
    Version(Uuid),
    Template(Uuid),
}

/// Resolved table, foreign-key column and parent id for an [`ItemOwner`].
#[derive(Debug, Clone, Copy)]
pub struct ItemLocation {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub owner_id: Uuid,
}

impl PlanTables {
    pub fn locate(&self, owner: ItemOwner) -> ItemLocation {
        match owner {
            ItemOwner::Version(id) => ItemLocation {
                table: self.items,
                owner_column: "plan_version_id",
                owner_id: id,
            },
            ItemOwner::Template(id) => ItemLocation {
                table: self.template_items,
                owner_column: "template_id",
                owner_id: id,
            },
        }
    }
}

/// List the line items under a parent, ordered by `order_index`.
pub async fn list_items<T>(conn: &mut PgConnection, location: ItemLocation) -> Result<Vec<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!(
        "SELECT * FROM {} WHERE {} = $1 ORDER BY order_index ASC",
        location.table, location.owner_column
    );
    let items = sqlx::query_as::<_, T>(&sql)
        .bind(location.owner_id)
        .fetch_all(&mut *conn)
        .await
        .with_context(|| format!("failed to list items from {}", location.table))?;

    Ok(items)
}

/// Delete every line item under a parent. Returns the number removed.
pub async fn delete_items(conn: &mut PgConnection, location: ItemLocation) -> Result<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        location.table, location.owner_column
    );
    let result = sqlx::query(&sql)
        .bind(location.owner_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("failed to delete items from {}", location.table))?;

    Ok(result.rows_affected())
}

/// Fetch a plan line item only if it belongs to a version owned by
/// `client_id`.
pub async fn get_item_for_client<T>(
    conn: &mut PgConnection,
    tables: &PlanTables,
    client_id: Uuid,
    item_id: Uuid,
) -> Result<Option<T>>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!(
        "SELECT i.* FROM {items} i \
         JOIN {versions} v ON v.id = i.plan_version_id \
         WHERE i.id = $1 AND v.client_id = $2",
        items = tables.items,
        versions = tables.versions,
    );
    let item = sqlx::query_as::<_, T>(&sql)
        .bind(item_id)
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("failed to fetch item from {}", tables.items))?;

    Ok(item)
}
