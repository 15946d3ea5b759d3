//! Versioned plan store.
//!
//! A client has any number of dated versions per plan kind and at most one
//! open one (`followed_till IS NULL`). Opening a new active version closes
//! whatever was open, in the same transaction.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Acquire, Postgres};
use tracing::info;
use uuid::Uuid;

use coach_db::models::{PlanVersion, VersionSummary};
use coach_db::queries::versions::{self, NewVersion};
use coach_db::queries::{self, ItemOwner, clients};

use crate::error::{CoachError, CoachResult};
use crate::kind::{self, PlanKind};

/// A version together with its line items in `order_index` order.
#[derive(Debug, Clone, Serialize)]
pub struct PlanWithItems<T> {
    #[serde(flatten)]
    pub version: PlanVersion,
    pub items: Vec<T>,
}

/// Input for [`create_version`].
#[derive(Debug, Clone)]
pub struct VersionDraft<N> {
    pub client_id: Uuid,
    pub trainer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<N>,
    /// Open the version (closing the current one) instead of filing it as
    /// an already-closed record.
    pub make_active: bool,
}

/// Create a version effective from today (UTC).
pub async fn create_version<'a, K, A>(
    db: A,
    draft: &VersionDraft<K::NewItem>,
) -> CoachResult<PlanWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    create_version_on::<K, A>(db, draft, Utc::now().date_naive()).await
}

/// Create a version effective from `today`.
///
/// Runs in one transaction: lock the client row, close every open version
/// when `make_active`, insert the version, insert its items. The trainer
/// must own the client.
pub async fn create_version_on<'a, K, A>(
    db: A,
    draft: &VersionDraft<K::NewItem>,
    today: NaiveDate,
) -> CoachResult<PlanWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(CoachError::validation("Title is required"));
    }
    kind::validate_items::<K>(&draft.items)?;

    let mut tx = db.begin().await?;

    // Serializes concurrent writers for the same client.
    if !clients::lock_client_for_trainer(&mut *tx, draft.trainer_id, draft.client_id).await? {
        return Err(CoachError::not_found("Client not found"));
    }

    let closed = if draft.make_active {
        versions::close_open_versions(&mut *tx, &K::TABLES, draft.client_id, today).await?
    } else {
        0
    };

    let version = versions::insert_version(
        &mut *tx,
        &K::TABLES,
        &NewVersion {
            client_id: draft.client_id,
            created_by_trainer_id: Some(draft.trainer_id),
            title,
            description: draft.description.as_deref(),
            followed_from: today,
            followed_till: if draft.make_active { None } else { Some(today) },
        },
    )
    .await?;

    let location = K::TABLES.locate(ItemOwner::Version(version.id));
    let items = kind::insert_items::<K>(&mut *tx, location, &draft.items).await?;

    tx.commit().await?;

    info!(
        kind = K::NAME,
        client_id = %draft.client_id,
        version_id = %version.id,
        items = items.len(),
        closed,
        active = draft.make_active,
        "plan version created"
    );

    Ok(PlanWithItems { version, items })
}

/// The client's open version with its items.
///
/// No open version is a normal outcome, reported as `NotFound` with a
/// message callers can show as-is.
pub async fn get_current<'a, K, A>(db: A, client_id: Uuid) -> CoachResult<PlanWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    let version = versions::get_open_version(&mut *conn, &K::TABLES, client_id)
        .await?
        .ok_or_else(|| CoachError::not_found(format!("No active {} plan found", K::NAME)))?;

    let items =
        queries::list_items(&mut *conn, K::TABLES.locate(ItemOwner::Version(version.id))).await?;
    Ok(PlanWithItems { version, items })
}

/// Version history, newest `followed_from` first.
pub async fn get_history<'a, K, A>(db: A, client_id: Uuid) -> CoachResult<Vec<VersionSummary>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    Ok(versions::list_version_summaries(&mut *conn, &K::TABLES, client_id).await?)
}

/// One version with its items. Versions of other clients are `NotFound`.
pub async fn get_version<'a, K, A>(
    db: A,
    client_id: Uuid,
    version_id: Uuid,
) -> CoachResult<PlanWithItems<K::Item>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    let version = versions::get_version_for_client(&mut *conn, &K::TABLES, client_id, version_id)
        .await?
        .ok_or_else(|| {
            CoachError::not_found(format!("{} plan version not found", title_case(K::NAME)))
        })?;

    let items =
        queries::list_items(&mut *conn, K::TABLES.locate(ItemOwner::Version(version.id))).await?;
    Ok(PlanWithItems { version, items })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
