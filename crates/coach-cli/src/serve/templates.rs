//! Template routes under `/api/templates/{diet|workout}`. Staff only.

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use coach_core::PlanKind;
use coach_core::template::{self, Instantiation, TemplateDraft};

use super::AppState;
use super::auth::{Staff, parse_id};
use super::error::AppError;

pub fn routes<K: PlanKind>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/api/templates/{}", K::NAME);
    router
        .route(&base, get(list::<K>).post(create::<K>))
        .route(
            &format!("{base}/{{id}}"),
            get(fetch::<K>).put(update::<K>).delete(remove::<K>),
        )
        .route(&format!("{base}/{{id}}/instantiate"), post(instantiate::<K>))
}

async fn list<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
) -> Result<Response, AppError> {
    let templates = template::list_templates::<K, _>(&state.pool, identity.user_id).await?;
    Ok(Json(templates).into_response())
}

async fn create<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    body: Result<Json<TemplateDraft<K::NewItem>>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(draft) = body?;
    let created = template::create_template::<K, _>(&state.pool, identity.user_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn fetch<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "template")?;
    let found = template::get_template::<K, _>(&state.pool, identity.user_id, id).await?;
    Ok(Json(found).into_response())
}

async fn update<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(id): Path<String>,
    body: Result<Json<TemplateDraft<K::NewItem>>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "template")?;
    let Json(draft) = body?;
    let updated = template::update_template::<K, _>(&state.pool, identity.user_id, id, &draft).await?;
    Ok(Json(updated).into_response())
}

async fn remove<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "template")?;
    template::delete_template::<K, _>(&state.pool, identity.user_id, id).await?;
    Ok(Json(serde_json::json!({ "message": "Template deleted" })).into_response())
}

async fn instantiate<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(id): Path<String>,
    body: Result<Json<Instantiation>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "template")?;
    let Json(request) = body?;
    let plan = template::instantiate_template::<K, _>(&state.pool, identity.user_id, id, &request).await?;
    Ok((StatusCode::CREATED, Json(plan)).into_response())
}
