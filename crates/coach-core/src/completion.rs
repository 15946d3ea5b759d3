//! Completion tracker: mark a line item done (or not) for a date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Acquire, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use coach_db::queries::{self, completions};

use crate::blob::{BlobStore, Evidence};
use crate::error::{CoachError, CoachResult};
use crate::kind::{EvidencePolicy, PlanKind};

/// Who is marking the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The client, for themselves. Cardio needs a photo.
    Client,
    /// The client's trainer. Evidence is optional even for cardio.
    Trainer,
}

/// Result of [`mark_complete`].
#[derive(Debug, Clone, Serialize)]
pub struct CompletionMark {
    pub completion_id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub evidence_url: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Decide what to do with an evidence file under `policy`.
///
/// Returns the evidence to store, if any.
fn evidence_to_store(
    policy: EvidencePolicy,
    evidence: Option<Evidence>,
    actor: Actor,
) -> CoachResult<Option<Evidence>> {
    match (policy, evidence, actor) {
        (EvidencePolicy::Required, Some(file), _) => Ok(Some(file)),
        (EvidencePolicy::Required, None, Actor::Client) => Err(CoachError::validation(
            "Photo proof required for cardio workouts",
        )),
        (EvidencePolicy::Required, None, Actor::Trainer) => Ok(None),
        (EvidencePolicy::NotStored, _, _) => Ok(None),
    }
}

/// Record that `client_id` completed `item_id` on `date`.
///
/// The item must belong to one of the client's versions. Evidence is
/// written to `blobs` before the completion row, and a repeat mark
/// overwrites the previous evidence and timestamp.
pub async fn mark_complete<'a, K, A>(
    db: A,
    blobs: &dyn BlobStore,
    client_id: Uuid,
    item_id: Uuid,
    date: NaiveDate,
    evidence: Option<Evidence>,
    actor: Actor,
) -> CoachResult<CompletionMark>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;

    let item: K::Item = queries::get_item_for_client(&mut *conn, &K::TABLES, client_id, item_id)
        .await?
        .ok_or_else(|| CoachError::not_found(format!("{} not found", K::ITEM_LABEL)))?;

    let supplied = evidence.is_some();
    let to_store = evidence_to_store(K::evidence_policy(&item), evidence, actor)?;
    if supplied && to_store.is_none() {
        debug!(kind = K::NAME, %item_id, "evidence ignored for this item");
    }

    let evidence_url = match to_store {
        Some(file) => Some(blobs.put(&file).await?),
        None => None,
    };

    let row = completions::upsert_completion(
        &mut *conn,
        &K::TABLES,
        client_id,
        item_id,
        date,
        evidence_url.as_deref(),
    )
    .await?;

    info!(
        kind = K::NAME,
        %client_id,
        %item_id,
        %date,
        ?actor,
        evidence = row.evidence_url.is_some(),
        "item marked complete"
    );

    Ok(CompletionMark {
        completion_id: row.id,
        item_id: row.item_id,
        date: row.date,
        evidence_url: row.evidence_url,
        completed_at: row.completed_at,
    })
}

/// Remove a completion mark. Removing one that does not exist succeeds.
pub async fn mark_incomplete<'a, K, A>(
    db: A,
    client_id: Uuid,
    item_id: Uuid,
    date: NaiveDate,
) -> CoachResult<()>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let mut conn = db.acquire().await?;
    let removed =
        completions::delete_completion(&mut *conn, &K::TABLES, client_id, item_id, date).await?;

    debug!(kind = K::NAME, %client_id, %item_id, %date, removed, "item marked incomplete");
    Ok(())
}
