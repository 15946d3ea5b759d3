//! Day resolver: which line items a client has on a calendar date, and
//! whether each was completed.
//!
//! A date resolves to the version whose inclusive range covers it. Closed
//! ranges may overlap, so when several versions cover a date the one with
//! the latest `followed_from` wins, then the most recently created.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Acquire, Postgres};
use tracing::debug;
use uuid::Uuid;

use coach_db::models::{Completion, DayName, PlanVersion};
use coach_db::queries::{self, ItemOwner, completions, versions};

use crate::error::{CoachError, CoachResult};
use crate::kind::PlanKind;

/// Longest span `resolve_for_range` accepts, in days between the bounds.
pub const MAX_RANGE_DAYS: i64 = 366;

/// A line item scheduled on a date, joined with its completion.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem<T> {
    #[serde(flatten)]
    pub item: T,
    pub plan_version_id: Uuid,
    pub is_completed: bool,
    pub completion_id: Option<Uuid>,
    pub evidence_url: Option<String>,
}

/// The resolved items of one date.
#[derive(Debug, Clone, Serialize)]
pub struct DayGroup<T> {
    pub date: NaiveDate,
    pub items: Vec<ResolvedItem<T>>,
}

/// The version in effect on `date`, if any.
pub fn covering_version(versions: &[PlanVersion], date: NaiveDate) -> Option<&PlanVersion> {
    versions
        .iter()
        .filter(|v| v.covers(date))
        .max_by_key(|v| (v.followed_from, v.created_at))
}

/// Check `from <= to` and the span limit.
pub fn validate_range(from: NaiveDate, to: NaiveDate) -> CoachResult<()> {
    if from > to {
        return Err(CoachError::validation(
            "from_date must be on or before to_date",
        ));
    }
    if (to - from).num_days() > MAX_RANGE_DAYS {
        return Err(CoachError::validation(format!(
            "Date range must not exceed {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Dates from `to` back to `from`, inclusive.
fn dates_newest_first(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(to), |d| d.pred_opt()).take_while(move |d| *d >= from)
}

/// Items scheduled for `date` from the version covering it, in
/// `order_index` order. No covering version gives an empty list.
pub async fn resolve_for_date<'a, K, A>(
    db: A,
    client_id: Uuid,
    date: NaiveDate,
) -> CoachResult<Vec<ResolvedItem<K::Item>>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    let groups = resolve_for_range::<K, A>(db, client_id, date, date).await?;
    Ok(groups.into_iter().next().map(|g| g.items).unwrap_or_default())
}

/// Per-date resolution over `[from, to]`, newest date first.
///
/// Each date is resolved on its own, so a range can straddle versions.
///
/// Only dates with at least one scheduled item get a [`DayGroup`]. A date
/// outside every version, or a weekday the covering version schedules
/// nothing on, is omitted rather than returned with empty `items`, so the
/// result may hold fewer groups than there are days in the range.
pub async fn resolve_for_range<'a, K, A>(
    db: A,
    client_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> CoachResult<Vec<DayGroup<K::Item>>>
where
    K: PlanKind,
    A: Acquire<'a, Database = Postgres>,
{
    validate_range(from, to)?;

    let mut conn = db.acquire().await?;
    let candidates =
        versions::list_versions_overlapping(&mut *conn, &K::TABLES, client_id, from, to).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let marks =
        completions::list_completions_between(&mut *conn, &K::TABLES, client_id, from, to).await?;
    let marks: HashMap<(Uuid, NaiveDate), Completion> = marks
        .into_iter()
        .map(|c| ((c.item_id, c.date), c))
        .collect();

    let mut items_by_version: HashMap<Uuid, Vec<K::Item>> = HashMap::new();
    let mut groups = Vec::new();

    for date in dates_newest_first(from, to) {
        let Some(version) = covering_version(&candidates, date) else {
            continue;
        };

        if let Entry::Vacant(slot) = items_by_version.entry(version.id) {
            let location = K::TABLES.locate(ItemOwner::Version(version.id));
            slot.insert(queries::list_items(&mut *conn, location).await?);
        }
        let Some(items) = items_by_version.get(&version.id) else {
            continue;
        };

        let day = DayName::of(date);
        let resolved: Vec<_> = items
            .iter()
            .filter(|item| K::scheduled_on(item, day))
            .map(|item| {
                let mark = marks.get(&(K::item_id(item), date));
                ResolvedItem {
                    item: item.clone(),
                    plan_version_id: version.id,
                    is_completed: mark.is_some(),
                    completion_id: mark.map(|c| c.id),
                    evidence_url: mark.and_then(|c| c.evidence_url.clone()),
                }
            })
            .collect();

        if !resolved.is_empty() {
            groups.push(DayGroup {
                date,
                items: resolved,
            });
        }
    }

    debug!(
        kind = K::NAME,
        %client_id,
        %from,
        %to,
        versions = items_by_version.len(),
        days = groups.len(),
        "resolved plan range"
    );

    Ok(groups)
}
