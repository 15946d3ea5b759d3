//! Versioned plan routes under `/api/clients/{client}/{diet|workout}-plans`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use uuid::Uuid;

use coach_core::PlanKind;
use coach_core::plan::{self, VersionDraft};

use super::AppState;
use super::auth::{Caller, Staff, parse_id, readable_client};
use super::error::AppError;

/// Body of a create-version request.
#[derive(Debug, Deserialize)]
pub struct NewPlanBody<N> {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "Vec::new", alias = "meals", alias = "exercises")]
    pub items: Vec<N>,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Mount the routes for plan kind `K`.
pub fn routes<K: PlanKind>(router: axum::Router<AppState>) -> axum::Router<AppState> {
    let base = format!("/api/clients/{{client}}/{}-plans", K::NAME);
    router
        .route(&base, axum::routing::post(create::<K>))
        .route(&format!("{base}/current"), get(current::<K>))
        .route(&format!("{base}/versions"), get(history::<K>))
        .route(&format!("{base}/{{version_id}}"), get(version::<K>))
}

async fn current<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(client): Path<String>,
) -> Result<Response, AppError> {
    let client_id = readable_client(&state, &identity, &client).await?;
    let plan = plan::get_current::<K, _>(&state.pool, client_id).await?;
    Ok(Json(plan).into_response())
}

async fn history<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(client): Path<String>,
) -> Result<Response, AppError> {
    let client_id = readable_client(&state, &identity, &client).await?;
    let versions = plan::get_history::<K, _>(&state.pool, client_id).await?;
    Ok(Json(versions).into_response())
}

async fn version<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path((client, version_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let client_id = readable_client(&state, &identity, &client).await?;
    let version_id = parse_id(&version_id, "version")?;
    let plan = plan::get_version::<K, _>(&state.pool, client_id, version_id).await?;
    Ok(Json(plan).into_response())
}

async fn create<K: PlanKind>(
    State(state): State<AppState>,
    Staff(identity): Staff,
    Path(client): Path<String>,
    body: Result<Json<NewPlanBody<K::NewItem>>, JsonRejection>,
) -> Result<Response, AppError> {
    let client_id: Uuid = parse_id(&client, "client")?;
    let Json(body) = body?;

    let draft = VersionDraft {
        client_id,
        trainer_id: identity.user_id,
        title: body.title,
        description: body.description,
        items: body.items,
        make_active: body.is_active,
    };
    let plan = plan::create_version::<K, _>(&state.pool, &draft).await?;
    Ok((StatusCode::CREATED, Json(plan)).into_response())
}

#[cfg(test)]
mod tests {
    use coach_db::models::NewExercise;

    use super::*;

    #[test]
    fn body_accepts_kind_item_aliases() {
        let body: NewPlanBody<NewExercise> = serde_json::from_str(
            r#"{"title":"Push","exercises":[{"name":"Bench","day_name":"Monday"}],"isActive":false}"#,
        )
        .unwrap();
        assert_eq!(body.items.len(), 1);
        assert!(!body.is_active);

        let body: NewPlanBody<NewExercise> = serde_json::from_str(r#"{"title":"Push"}"#).unwrap();
        assert!(body.is_active);
        assert!(body.items.is_empty());
    }
}
