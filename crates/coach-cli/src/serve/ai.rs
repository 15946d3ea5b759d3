use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};

use coach_core::extract::{self, ExtractionRequest};

use super::AppState;
use super::auth::Staff;
use super::error::AppError;

/// `POST /api/ai/extract-plan`: propose a plan from a photo for review.
pub async fn extract_plan(
    State(state): State<AppState>,
    Staff(identity): Staff,
    body: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body?;
    if request.image_data().trim().is_empty() {
        return Err(AppError::bad_request("Image is required"));
    }
    tracing::info!(trainer_id = %identity.user_id, kind = %request.kind, "extracting plan from image");
    let candidate = extract::extract_plan(state.extractor.as_ref(), &request).await?;
    Ok(Json(candidate).into_response())
}
