//! The caller's own day-by-day plan: `/api/{workout|diet}-sessions`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use coach_core::PlanKind;
use coach_core::blob::Evidence;
use coach_core::completion::{self, Actor};
use coach_core::plan;

use super::AppState;
use super::auth::{Caller, parse_id};
use super::error::AppError;

/// Multipart field carrying the photo proof.
const PHOTO_FIELD: &str = "machinePhoto";

/// `?date=` for one day, or `?from_date=&to_date=` for a range.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub date: Option<NaiveDate>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// JSON body naming the date of a completion.
#[derive(Debug, Default, Deserialize)]
pub struct DateBody {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl DateBody {
    pub fn required(self) -> Result<NaiveDate, AppError> {
        self.date.ok_or_else(|| AppError::bad_request("Date is required"))
    }
}

/// A completion request: a date plus an optional photo.
///
/// Accepts `multipart/form-data` (`date`, `machinePhoto`) or a JSON
/// `{"date": ...}` body.
#[derive(Debug)]
pub struct CompletionInput {
    pub date: NaiveDate,
    pub evidence: Option<Evidence>,
}

impl FromRequest<AppState> for CompletionInput {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Json(body) = Json::<DateBody>::from_request(req, state).await?;
            Ok(Self {
                date: body.required()?,
                evidence: None,
            })
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<CompletionInput, AppError> {
    let mut date = None;
    let mut evidence = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("date") => {
                let text = field.text().await?;
                let parsed = text
                    .trim()
                    .parse::<NaiveDate>()
                    .map_err(|_| AppError::bad_request(format!("Invalid date: {text:?}")))?;
                date = Some(parsed);
            }
            Some(PHOTO_FIELD) => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    evidence = Some(Evidence {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(CompletionInput {
        date: date.ok_or_else(|| AppError::bad_request("Date is required"))?,
        evidence,
    })
}

/// Resolve `client_id`'s plan of kind `K` for the requested day or range.
///
/// A range answers one group per date that has scheduled items; empty days
/// are not listed.
pub async fn resolve_sessions<K: PlanKind>(
    state: &AppState,
    client_id: Uuid,
    query: SessionQuery,
) -> Result<Response, AppError> {
    match query {
        SessionQuery {
            date: Some(date), ..
        } => {
            let items = plan::resolve_for_date::<K, _>(&state.pool, client_id, date).await?;
            Ok(Json(items).into_response())
        }
        SessionQuery {
            from_date: Some(from),
            to_date: Some(to),
            ..
        } => {
            let days = plan::resolve_for_range::<K, _>(&state.pool, client_id, from, to).await?;
            Ok(Json(days).into_response())
        }
        _ => Err(AppError::bad_request("Date or Date Range required")),
    }
}

/// Mount the routes for plan kind `K`.
pub fn routes<K: PlanKind>(router: axum::Router<AppState>) -> axum::Router<AppState> {
    let base = format!("/api/{}-sessions", K::NAME);
    router
        .route(&base, get(list::<K>))
        .route(&format!("{base}/{{item_id}}/complete"), post(complete::<K>))
        .route(&format!("{base}/{{item_id}}/incomplete"), post(incomplete::<K>))
}

async fn list<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    resolve_sessions::<K>(&state, identity.user_id, query).await
}

async fn complete<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(item_id): Path<String>,
    input: CompletionInput,
) -> Result<Response, AppError> {
    let item_id = parse_id(&item_id, "item")?;
    let mark = completion::mark_complete::<K, _>(
        &state.pool,
        state.blobs.as_ref(),
        identity.user_id,
        item_id,
        input.date,
        input.evidence,
        Actor::Client,
    )
    .await?;
    Ok(Json(mark).into_response())
}

async fn incomplete<K: PlanKind>(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(item_id): Path<String>,
    body: Result<Json<DateBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let item_id = parse_id(&item_id, "item")?;
    let Json(body) = body?;
    completion::mark_incomplete::<K, _>(&state.pool, identity.user_id, item_id, body.required()?)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })).into_response())
}
