//! Meals a user actually ate, as opposed to what their diet plan prescribes.
//!
//! Any authenticated user keeps their own log. Trainers can read their
//! clients' logs.

use sqlx::{Acquire, Postgres};
use tracing::info;
use uuid::Uuid;

use coach_db::models::{MealLog, NewMealLog};
use coach_db::queries::clients;
use coach_db::queries::meal_logs::{self, MealLogQuery};

use crate::error::{CoachError, CoachResult};

/// Check a new entry and return its calorie estimate.
fn validate(new: &NewMealLog) -> CoachResult<f64> {
    let Some(calories) = new
        .calories_est
        .filter(|c| c.is_finite() && *c > 0.0 && !new.meal_type.trim().is_empty())
    else {
        return Err(CoachError::validation("Meal type and calories are required"));
    };
    let macros = [new.protein, new.carbs, new.fat];
    if macros
        .into_iter()
        .flatten()
        .any(|grams| !grams.is_finite() || grams < 0.0)
    {
        return Err(CoachError::validation("Macros must not be negative"));
    }
    Ok(calories)
}

/// Record a meal in `user_id`'s log.
pub async fn log_meal<'a, A>(db: A, user_id: Uuid, new: &NewMealLog) -> CoachResult<MealLog>
where
    A: Acquire<'a, Database = Postgres>,
{
    let calories = validate(new)?;
    let mut conn = db.acquire().await?;
    let log = meal_logs::insert_meal_log(&mut *conn, user_id, new, calories).await?;
    info!(%user_id, meal_log_id = %log.id, meal_type = %log.meal_type, "meal logged");
    Ok(log)
}

/// One entry of the caller's own log.
pub async fn get_meal_log<'a, A>(db: A, user_id: Uuid, id: Uuid) -> CoachResult<MealLog>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    meal_logs::get_meal_log(&mut *conn, user_id, id)
        .await?
        .ok_or_else(|| CoachError::not_found("Meal not found"))
}

pub async fn list_meal_logs<'a, A>(
    db: A,
    user_id: Uuid,
    query: &MealLogQuery,
) -> CoachResult<Vec<MealLog>>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    Ok(meal_logs::list_meal_logs(&mut *conn, user_id, query).await?)
}

/// A trainer's view of one client's log.
pub async fn list_client_meal_logs<'a, A>(
    db: A,
    trainer_id: Uuid,
    client_id: Uuid,
    query: &MealLogQuery,
) -> CoachResult<Vec<MealLog>>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    if clients::get_client_for_trainer(&mut *conn, trainer_id, client_id)
        .await?
        .is_none()
    {
        return Err(CoachError::not_found("Client not found"));
    }
    Ok(meal_logs::list_meal_logs(&mut *conn, client_id, query).await?)
}
