//! Request extractors for authenticated callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use coach_core::CoachError;
use coach_core::auth::Identity;
use coach_core::auth::guard::{self, ClientRef};

use super::AppState;
use super::error::AppError;

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

/// An authenticated trainer or gym owner.
#[derive(Debug, Clone, Copy)]
pub struct Staff(pub Identity);

fn authenticate(parts: &Parts, state: &AppState) -> Result<Identity, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    Ok(guard::authenticate(&state.tokens, header)?)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = authenticate(parts, state)?;
        guard::require_staff(&identity)?;
        Ok(Self(identity))
    }
}

/// Resolve a `{client}` path segment (`me` or an id) the caller may read.
pub async fn readable_client(
    state: &AppState,
    identity: &Identity,
    segment: &str,
) -> Result<Uuid, AppError> {
    let client: ClientRef = segment.parse()?;
    Ok(guard::resolve_client_access(&state.pool, identity, client).await?)
}

/// Parse an id path segment, reporting a bad one as a validation error.
pub fn parse_id(segment: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(segment)
        .map_err(|_| CoachError::validation(format!("invalid {what} id: {segment:?}")).into())
}
