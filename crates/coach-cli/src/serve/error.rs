use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use coach_core::CoachError;
use coach_core::auth::guard::GuardError;
use coach_core::extract::ExtractError;

/// An error response: `{"error": message}` with a status code.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<CoachError> for AppError {
    fn from(err: CoachError) -> Self {
        match err {
            CoachError::Validation(msg) | CoachError::Conflict(msg) => Self::bad_request(msg),
            CoachError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            CoachError::Storage(err) => Self::internal(err),
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::MissingCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
            }
            GuardError::InvalidToken(err) => {
                tracing::debug!(%err, "rejected bearer token");
                Self::new(StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
            GuardError::Forbidden => Self::new(StatusCode::FORBIDDEN, "Trainer access required"),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Unavailable => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Plan extraction is not configured",
            ),
            ExtractError::Failed(msg) => {
                tracing::warn!(%msg, "plan extraction failed");
                Self::new(StatusCode::BAD_GATEWAY, "Failed to extract plan from image")
            }
            ExtractError::Malformed(err) => {
                tracing::warn!(%err, "plan extraction returned malformed JSON");
                Self::new(StatusCode::BAD_GATEWAY, "Failed to extract plan from image")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::bad_request(err.body_text())
    }
}
