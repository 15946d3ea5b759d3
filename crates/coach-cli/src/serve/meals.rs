//! Meal-log routes under `/api/meals`. Every caller reads and writes only
//! their own log.

use axum::Json;
use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use coach_core::meal_log;
use coach_db::models::NewMealLog;
use coach_db::queries::meal_logs::MealLogQuery;

use super::AppState;
use super::auth::{Caller, parse_id};
use super::error::AppError;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/meals", get(list).post(create))
        .route("/api/meals/{id}", get(fetch))
}

async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
    query: Result<Query<MealLogQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let logs = meal_log::list_meal_logs(&state.pool, identity.user_id, &query).await?;
    Ok(Json(logs).into_response())
}

async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    body: Result<Json<NewMealLog>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = body?;
    let log = meal_log::log_meal(&state.pool, identity.user_id, &new).await?;
    Ok((StatusCode::CREATED, Json(log)).into_response())
}

async fn fetch(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "meal")?;
    let log = meal_log::get_meal_log(&state.pool, identity.user_id, id).await?;
    Ok(Json(log).into_response())
}
