//! Insert query for meal line items (`diet_plan_meals`,
//! `diet_template_meals`).

use anyhow::{Context, Result};
use sqlx::PgConnection;

use super::ItemLocation;
use crate::models::{Meal, NewMeal};

/// Round a macro value to two decimals; missing values become zero.
pub fn normalize_macro(value: Option<f64>) -> f64 {
    value
        .filter(|v| v.is_finite())
        .map(|v| (v * 100.0).round() / 100.0)
        .unwrap_or(0.0)
}

/// Insert one meal under the given parent at `order_index`.
pub async fn insert_meal(
    conn: &mut PgConnection,
    location: ItemLocation,
    order_index: i32,
    meal: &NewMeal,
) -> Result<Meal> {
    let sql = format!(
        "INSERT INTO {} ({}, day_name, meal_type, name, description, \
                         protein_g, carbs_g, fat_g, calories_kcal, order_index) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING *",
        location.table, location.owner_column
    );
    let row = sqlx::query_as::<_, Meal>(&sql)
        .bind(location.owner_id)
        .bind(meal.day_name)
        .bind(&meal.meal_type)
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(normalize_macro(meal.protein_g))
        .bind(normalize_macro(meal.carbs_g))
        .bind(normalize_macro(meal.fat_g))
        .bind(normalize_macro(meal.calories_kcal))
        .bind(order_index)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to insert meal {:?}", meal.name))?;

    Ok(row)
}
