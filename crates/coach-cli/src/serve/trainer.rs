//! Trainer routes under `/api/trainer`: client accounts, their plans by
//! day, completions on their behalf, their meal logs and session credits.

use axum::Json;
use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use coach_core::completion::{self, Actor};
use coach_core::meal_log;
use coach_core::session::{self, NewClient};
use coach_core::{Diet, PlanKind, Workout};
use coach_db::queries::clients::ClientQuery;
use coach_db::queries::meal_logs::MealLogQuery;

use super::AppState;
use super::auth::{Staff, parse_id};
use super::error::AppError;
use super::sessions::{CompletionInput, DateBody, SessionQuery, resolve_sessions};

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    let router = router
        .route("/api/trainer/clients", get(list_clients).post(add_client))
        .route("/api/trainer/clients/{client_id}", get(get_client))
        .route("/api/trainer/clients/{client_id}/meals", get(client_meal_logs))
        .route(
            "/api/trainer/clients/{client_id}/sessions/complete",
            post(complete_session),
        );
    let router = kind_routes::<Workout>(router, "workouts");
    kind_routes::<Diet>(router, "diet")
}

fn kind_routes<K: PlanKind>(router: Router<AppState>, segment: &str) -> Router<AppState> {
    let base = format!("/api/trainer/clients/{{client_id}}/{segment}");
    router
        .route(&base, get(client_day::<K>))
        .route(&format!("{base}/history"), get(client_history::<K>))
        .route(&format!("{base}/{{item_id}}/complete"), post(complete_item::<K>))
        .route(&format!("{base}/{{item_id}}/incomplete"), post(incomplete_item::<K>))
}

/// `{client_id}` and `{item_id}` path segments.
#[derive(Debug, Deserialize)]
struct ItemPath {
    client_id: String,
    item_id: String,
}

/// Resolve a path client id to one of the trainer's clients.
async fn owned_client(state: &AppState, trainer_id: Uuid, segment: &str) -> Result<Uuid, AppError> {
    let client_id = parse_id(segment, "client")?;
    let client = session::get_client(&state.pool, trainer_id, client_id).await?;
    Ok(client.user.id)
}

async fn list_clients(
    State(state): State<AppState>,
    Staff(identity): Staff,
    query: Result<Query<ClientQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let clients = session::list_clients(&state.pool, identity.user_id, &query).await?;
    Ok(Json(clients).into_response())
}

async fn add_client(
    State(state): State<AppState>,
    Staff(identity): Staff,
    body: Result<Json<NewClient>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(new) = body?;
    let client = session::add_client(&state.pool, identity.user_id, &new).await?;
    Ok((StatusCode::CREATED, Json(client)).into_response())
}

async fn get_client(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client_id): Path<String>,
) -> Result<Response, AppError> {
    let client_id = parse_id(&client_id, "client")?;
    let client = session::get_client(&state.pool, identity.user_id, client_id).await?;
    Ok(Json(client).into_response())
}

async fn complete_session(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client_id): Path<String>,
) -> Result<Response, AppError> {
    let client_id = parse_id(&client_id, "client")?;
    let tally = session::mark_session_complete(&state.pool, identity.user_id, client_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Session marked as complete",
        "completed_sessions": tally.completed,
        "total_sessions": tally.total,
    }))
    .into_response())
}

/// What the client logged as eaten, with the same filters as `/api/meals`.
async fn client_meal_logs(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client_id): Path<String>,
    query: Result<Query<MealLogQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let client_id = parse_id(&client_id, "client")?;
    let Query(query) = query?;
    let logs = meal_log::list_client_meal_logs(&state.pool, identity.user_id, client_id, &query).await?;
    Ok(Json(logs).into_response())
}

/// One day of a client's plan. `?date=` is required.
async fn client_day<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client_id): Path<String>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let client_id = owned_client(&state, identity.user_id, &client_id).await?;
    let Query(query) = query?;
    let Some(date) = query.date else {
        return Err(AppError::bad_request("Date is required"));
    };
    let query = SessionQuery {
        date: Some(date),
        ..SessionQuery::default()
    };
    resolve_sessions::<K>(&state, client_id, query).await
}

/// A client's plan over `?from_date=&to_date=`, one group per date.
async fn client_history<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client_id): Path<String>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let client_id = owned_client(&state, identity.user_id, &client_id).await?;
    let Query(query) = query?;
    let (Some(from), Some(to)) = (query.from_date, query.to_date) else {
        return Err(AppError::bad_request("Date range required"));
    };
    let query = SessionQuery {
        from_date: Some(from),
        to_date: Some(to),
        ..SessionQuery::default()
    };
    resolve_sessions::<K>(&state, client_id, query).await
}

async fn complete_item<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(path): Path<ItemPath>,
    input: CompletionInput,
) -> Result<Response, AppError> {
    let client_id = owned_client(&state, identity.user_id, &path.client_id).await?;
    let item_id = parse_id(&path.item_id, "item")?;
    let mark = completion::mark_complete::<K, _>(
        &state.pool,
        state.blobs.as_ref(),
        client_id,
        item_id,
        input.date,
        input.evidence,
        Actor::Trainer,
    )
    .await?;
    Ok(Json(mark).into_response())
}

async fn incomplete_item<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(path): Path<ItemPath>,
    body: Result<Json<DateBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let client_id = owned_client(&state, identity.user_id, &path.client_id).await?;
    let item_id = parse_id(&path.item_id, "item")?;
    let Json(body) = body?;
    completion::mark_incomplete::<K, _>(&state.pool, client_id, item_id, body.required()?).await?;
    Ok(Json(serde_json::json!({ "success": true })).into_response())
}
