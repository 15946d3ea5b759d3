//! Insert query for exercise line items (`workout_plan_exercises`,
//! `workout_template_exercises`).

use anyhow::{Context, Result};
use sqlx::PgConnection;

use super::ItemLocation;
use crate::models::{DayName, Exercise, ExerciseCategory, NewExercise};

/// Insert one exercise under the given parent at `order_index`.
///
/// A missing day lands on Monday and a missing category on strength.
pub async fn insert_exercise(
    conn: &mut PgConnection,
    location: ItemLocation,
    order_index: i32,
    exercise: &NewExercise,
) -> Result<Exercise> {
    let sql = format!(
        "INSERT INTO {} ({}, day_name, name, category, sets, reps, duration, notes, order_index) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING *",
        location.table, location.owner_column
    );
    let row = sqlx::query_as::<_, Exercise>(&sql)
        .bind(location.owner_id)
        .bind(exercise.day_name.unwrap_or(DayName::Monday))
        .bind(&exercise.name)
        .bind(exercise.category.unwrap_or(ExerciseCategory::Strength))
        .bind(exercise.sets)
        .bind(&exercise.reps)
        .bind(&exercise.duration)
        .bind(&exercise.notes)
        .bind(order_index)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to insert exercise {:?}", exercise.name))?;

    Ok(row)
}
