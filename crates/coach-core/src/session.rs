//! Client accounts and their session credits.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Postgres};
use tracing::info;
use uuid::Uuid;

use coach_db::models::{ClientStatus, Role, User};
use coach_db::queries::clients::{self, ClientQuery, NewUser};

use crate::error::{self, CoachError, CoachResult};

/// Credits after a session was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTally {
    pub completed: i32,
    pub total: i32,
}

/// A client row with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub user: User,
    pub status: ClientStatus,
    pub remaining_sessions: i32,
}

impl From<User> for ClientSummary {
    fn from(user: User) -> Self {
        let status = user.status_at(Utc::now());
        let remaining_sessions = (user.total_sessions - user.completed_sessions).max(0);
        Self {
            user,
            status,
            remaining_sessions,
        }
    }
}

/// Fields for [`add_client`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    /// Purchased session credits.
    pub sessions: Option<i32>,
    /// Entitlement length in days from now. Absent means no expiry.
    #[serde(alias = "validity")]
    pub validity_days: Option<i64>,
}

/// Consume one of the client's session credits.
///
/// The increment is a single conditional UPDATE, so concurrent calls never
/// lose updates or overshoot. When nothing was updated, a lookup tells a
/// foreign client (`NotFound`) from exhausted credits (`Conflict`).
pub async fn mark_session_complete<'a, A>(
    db: A,
    trainer_id: Uuid,
    client_id: Uuid,
) -> CoachResult<SessionTally>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;

    if let Some((completed, total)) =
        clients::increment_completed_sessions(&mut *conn, trainer_id, client_id).await?
    {
        info!(%trainer_id, %client_id, completed, total, "session completed");
        return Ok(SessionTally { completed, total });
    }

    match clients::get_client_for_trainer(&mut *conn, trainer_id, client_id).await? {
        Some(_) => Err(CoachError::conflict("All sessions completed")),
        None => Err(CoachError::not_found("Client not found")),
    }
}

/// Create a client account owned by `trainer_id`.
pub async fn add_client<'a, A>(db: A, trainer_id: Uuid, new: &NewClient) -> CoachResult<ClientSummary>
where
    A: Acquire<'a, Database = Postgres>,
{
    let name = new.name.trim();
    let email = new.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(CoachError::validation("Name and email are required"));
    }
    if !email.contains('@') {
        return Err(CoachError::validation("Invalid email address"));
    }
    let total_sessions = new.sessions.unwrap_or(0);
    if total_sessions < 0 {
        return Err(CoachError::validation("Sessions must not be negative"));
    }
    let validity_expires_at = match new.validity_days {
        Some(days) if days <= 0 => {
            return Err(CoachError::validation("Validity must be a positive number of days"));
        }
        Some(days) => Some(
            Utc::now()
                + Duration::try_days(days)
                    .ok_or_else(|| CoachError::validation("Validity is too long"))?,
        ),
        None => None,
    };

    let mut conn = db.acquire().await?;
    if clients::email_exists(&mut *conn, email).await? {
        return Err(CoachError::conflict("User with this email already exists"));
    }

    let user = clients::insert_user(
        &mut *conn,
        &NewUser {
            email,
            name,
            role: Role::Client,
            trainer_id: Some(trainer_id),
            total_sessions,
            validity_expires_at,
        },
    )
    .await
    .map_err(|err| {
        // Lost a race with another insert of the same email.
        if error::is_unique_violation(&err) {
            CoachError::conflict("User with this email already exists")
        } else {
            CoachError::Storage(err)
        }
    })?;

    info!(%trainer_id, client_id = %user.id, total_sessions, "client added");
    Ok(user.into())
}

/// List a trainer's clients.
pub async fn list_clients<'a, A>(
    db: A,
    trainer_id: Uuid,
    query: &ClientQuery,
) -> CoachResult<Vec<ClientSummary>>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    let users = clients::list_clients(&mut *conn, trainer_id, query).await?;
    Ok(users.into_iter().map(ClientSummary::from).collect())
}

/// One of the trainer's clients.
pub async fn get_client<'a, A>(db: A, trainer_id: Uuid, client_id: Uuid) -> CoachResult<ClientSummary>
where
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    clients::get_client_for_trainer(&mut *conn, trainer_id, client_id)
        .await?
        .map(ClientSummary::from)
        .ok_or_else(|| CoachError::not_found("Client not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_accepts_validity_alias() {
        let new: NewClient =
            serde_json::from_str(r#"{"name":"Ann","email":"a@x.io","sessions":12,"validity":30}"#)
                .unwrap();
        assert_eq!(new.sessions, Some(12));
        assert_eq!(new.validity_days, Some(30));
    }

    #[test]
    fn summary_derives_status_and_remaining() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.io".into(),
            name: "Ann".into(),
            role: Role::Client,
            trainer_id: None,
            total_sessions: 10,
            completed_sessions: 10,
            validity_expires_at: None,
            created_at: Utc::now(),
        };
        let summary = ClientSummary::from(user);
        assert_eq!(summary.status, ClientStatus::Inactive);
        assert_eq!(summary.remaining_sessions, 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "Inactive");
        assert_eq!(json["total_sessions"], 10);
    }
}
