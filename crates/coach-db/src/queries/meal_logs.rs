//! Database query functions for the `meal_logs` table.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{MealLog, NewMealLog};

/// Column a meal-log listing is ordered by. Only these columns are sortable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealLogSort {
    #[default]
    CreatedAt,
    Date,
    Time,
    CaloriesEst,
    Protein,
    Carbs,
    Fat,
}

impl MealLogSort {
    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Date => "date",
            Self::Time => "time",
            Self::CaloriesEst => "calories_est",
            Self::Protein => "protein",
            Self::Carbs => "carbs",
            Self::Fat => "fat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(alias = "ASC")]
    Asc,
    #[default]
    #[serde(alias = "DESC")]
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters, ordering and paging for a meal-log listing.
///
/// Dates are inclusive. `meal_type` matches case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MealLogQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub meal_type: Option<String>,
    pub sort_by: MealLogSort,
    pub sort_order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Insert a meal log for `user_id`.
pub async fn insert_meal_log(
    conn: &mut PgConnection,
    user_id: Uuid,
    new: &NewMealLog,
    calories_est: f64,
) -> Result<MealLog> {
    let date = new.date.unwrap_or_else(|| Utc::now().date_naive());
    let log = sqlx::query_as::<_, MealLog>(
        "INSERT INTO meal_logs \
         (user_id, date, time, meal_type, foods_detected, calories_est, \
          protein, carbs, fat, notes, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(date)
    .bind(new.time)
    .bind(new.meal_type.trim())
    .bind(&new.foods_detected)
    .bind(calories_est)
    .bind(new.protein)
    .bind(new.carbs)
    .bind(new.fat)
    .bind(&new.notes)
    .bind(&new.image_url)
    .fetch_one(&mut *conn)
    .await
    .context("failed to insert meal log")?;

    Ok(log)
}

/// Fetch one of `user_id`'s meal logs.
pub async fn get_meal_log(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> Result<Option<MealLog>> {
    let log = sqlx::query_as::<_, MealLog>("SELECT * FROM meal_logs WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .context("failed to fetch meal log")?;

    Ok(log)
}

/// Build the listing query. Values are bound; the sort column and direction
/// come from closed enums.
fn build_meal_log_query(user_id: Uuid, query: &MealLogQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM meal_logs WHERE user_id = ");
    qb.push_bind(user_id);

    if let Some(from) = query.from_date {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = query.to_date {
        qb.push(" AND date <= ").push_bind(to);
    }
    if let Some(meal_type) = query
        .meal_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        qb.push(" AND lower(meal_type) = lower(")
            .push_bind(meal_type.to_owned())
            .push(")");
    }

    let direction = query.sort_order.keyword();
    qb.push(format!(
        " ORDER BY {} {direction} NULLS LAST, id {direction}",
        query.sort_by.column()
    ));

    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = query.offset {
        qb.push(" OFFSET ").push_bind(i64::from(offset));
    }

    qb
}

/// List `user_id`'s meal logs according to `query`.
pub async fn list_meal_logs(
    conn: &mut PgConnection,
    user_id: Uuid,
    query: &MealLogQuery,
) -> Result<Vec<MealLog>> {
    let mut qb = build_meal_log_query(user_id, query);
    let logs = qb
        .build_query_as::<MealLog>()
        .fetch_all(&mut *conn)
        .await
        .context("failed to list meal logs")?;

    Ok(logs)
}
