//! Access guards for API callers.
//!
//! - Every request carries `Authorization: Bearer <token>`.
//! - Trainer routes need a staff role (trainer or gym owner).
//! - Client-scoped reads accept `me` or an explicit client id, visible to
//!   the client themselves and to their trainer.

use std::str::FromStr;

use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use coach_db::queries::clients;

use super::{Identity, TokenConfig, TokenError, verify_token};
use crate::error::{CoachError, CoachResult};

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("missing bearer token")]
    MissingCredentials,

    #[error("invalid bearer token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("this action requires a trainer account")]
    Forbidden,
}

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, GuardError> {
    let value = header.ok_or(GuardError::MissingCredentials)?.trim();
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(GuardError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(GuardError::MissingCredentials);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(GuardError::MissingCredentials);
    }
    Ok(token)
}

/// Authenticate a request from its `Authorization` header value.
pub fn authenticate(config: &TokenConfig, header: Option<&str>) -> Result<Identity, GuardError> {
    let token = bearer_token(header)?;
    Ok(verify_token(config, token)?)
}

/// Require a trainer or gym owner.
pub fn require_staff(identity: &Identity) -> Result<(), GuardError> {
    if identity.role.is_staff() {
        Ok(())
    } else {
        Err(GuardError::Forbidden)
    }
}

/// A client named in a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRef {
    /// The caller.
    Me,
    Id(Uuid),
}

impl FromStr for ClientRef {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("me") {
            return Ok(Self::Me);
        }
        Uuid::parse_str(s)
            .map(Self::Id)
            .map_err(|_| CoachError::validation(format!("invalid client id: {s:?}")))
    }
}

/// Resolve `client` to a client id the caller may read.
///
/// Anything else is `NotFound`, so other trainers' clients look the same as
/// ids that do not exist.
pub async fn resolve_client_access<'a, A>(
    db: A,
    identity: &Identity,
    client: ClientRef,
) -> CoachResult<Uuid>
where
    A: Acquire<'a, Database = Postgres>,
{
    let client_id = match client {
        ClientRef::Me => return Ok(identity.user_id),
        ClientRef::Id(id) if id == identity.user_id => return Ok(id),
        ClientRef::Id(id) => id,
    };

    if identity.role.is_staff() {
        let mut conn = db.acquire().await?;
        if clients::get_client_for_trainer(&mut *conn, identity.user_id, client_id)
            .await?
            .is_some()
        {
            return Ok(client_id);
        }
    }
    Err(CoachError::not_found("Client not found"))
}
