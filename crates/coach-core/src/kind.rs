//! Plan kinds.
//!
//! Diet and workout plans share their whole lifecycle: dated versions,
//! weekday-tagged line items, completions and templates. [`PlanKind`]
//! captures the handful of places where they differ so the store, resolver,
//! completion tracker and templates are each written once.

use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use coach_db::models::{DayName, Exercise, ExerciseCategory, Meal, NewExercise, NewMeal};
use coach_db::queries::{DIET_TABLES, ItemLocation, PlanTables, WORKOUT_TABLES, exercises, meals};

use crate::error::{CoachError, CoachResult};

/// Whether a completion of an item stores photo evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidencePolicy {
    /// Evidence is kept. The client-facing path refuses a completion without it.
    Required,
    /// Evidence is never stored; a supplied file is dropped.
    NotStored,
}

/// One kind of plan (diet or workout).
#[async_trait]
pub trait PlanKind: Send + Sync + 'static {
    /// Persisted line item.
    type Item: for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Clone + Send + Sync + Unpin + 'static;
    /// Incoming line item fields.
    type NewItem: DeserializeOwned
        + Serialize
        + Clone
        + Send
        + Sync
        + 'static
        + for<'a> From<&'a Self::Item>;

    /// Lowercase name used in messages and logs ("diet", "workout").
    const NAME: &'static str;
    /// Human label for a single item ("Meal", "Exercise").
    const ITEM_LABEL: &'static str;
    const TABLES: PlanTables;

    async fn insert_item(
        conn: &mut PgConnection,
        location: ItemLocation,
        order_index: i32,
        item: &Self::NewItem,
    ) -> anyhow::Result<Self::Item>;

    fn item_id(item: &Self::Item) -> Uuid;

    /// Whether the item is scheduled on `day`.
    fn scheduled_on(item: &Self::Item, day: DayName) -> bool;

    fn evidence_policy(item: &Self::Item) -> EvidencePolicy;

    /// Name of an incoming item, for validation.
    fn new_item_name(item: &Self::NewItem) -> &str;
}

/// Diet plans: meals with macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diet;

#[async_trait]
impl PlanKind for Diet {
    type Item = Meal;
    type NewItem = NewMeal;

    const NAME: &'static str = "diet";
    const ITEM_LABEL: &'static str = "Meal";
    const TABLES: PlanTables = DIET_TABLES;

    async fn insert_item(
        conn: &mut PgConnection,
        location: ItemLocation,
        order_index: i32,
        item: &NewMeal,
    ) -> anyhow::Result<Meal> {
        meals::insert_meal(conn, location, order_index, item).await
    }

    fn item_id(item: &Meal) -> Uuid {
        item.id
    }

    /// A meal without a day is eaten every day.
    fn scheduled_on(item: &Meal, day: DayName) -> bool {
        item.day_name.is_none_or(|d| d == day)
    }

    fn evidence_policy(_item: &Meal) -> EvidencePolicy {
        EvidencePolicy::NotStored
    }

    fn new_item_name(item: &NewMeal) -> &str {
        &item.name
    }
}

/// Workout plans: exercises, where cardio completions carry a photo.
#[derive(Debug, Clone, Copy, Default)]
pub struct Workout;

#[async_trait]
impl PlanKind for Workout {
    type Item = Exercise;
    type NewItem = NewExercise;

    const NAME: &'static str = "workout";
    const ITEM_LABEL: &'static str = "Exercise";
    const TABLES: PlanTables = WORKOUT_TABLES;

    async fn insert_item(
        conn: &mut PgConnection,
        location: ItemLocation,
        order_index: i32,
        item: &NewExercise,
    ) -> anyhow::Result<Exercise> {
        exercises::insert_exercise(conn, location, order_index, item).await
    }

    fn item_id(item: &Exercise) -> Uuid {
        item.id
    }

    fn scheduled_on(item: &Exercise, day: DayName) -> bool {
        item.day_name == day
    }

    fn evidence_policy(item: &Exercise) -> EvidencePolicy {
        match item.category {
            ExerciseCategory::Cardio => EvidencePolicy::Required,
            _ => EvidencePolicy::NotStored,
        }
    }

    fn new_item_name(item: &NewExercise) -> &str {
        &item.name
    }
}

/// Reject incoming items without a name.
pub(crate) fn validate_items<K: PlanKind>(items: &[K::NewItem]) -> CoachResult<()> {
    match items
        .iter()
        .position(|item| K::new_item_name(item).trim().is_empty())
    {
        Some(pos) => Err(CoachError::validation(format!(
            "{} at position {pos} has no name",
            K::ITEM_LABEL
        ))),
        None => Ok(()),
    }
}

/// Insert `items` under `location`, numbering them by list position.
pub(crate) async fn insert_items<K: PlanKind>(
    conn: &mut PgConnection,
    location: ItemLocation,
    items: &[K::NewItem],
) -> anyhow::Result<Vec<K::Item>> {
    let mut inserted = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let order_index = i32::try_from(position).context("too many line items")?;
        inserted.push(K::insert_item(&mut *conn, location, order_index, item).await?);
    }
    Ok(inserted)
}

// ---------------------------------------------------------------------------

/// Runtime tag for a plan kind, as it appears in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Diet,
    Workout,
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diet => f.write_str(Diet::NAME),
            Self::Workout => f.write_str(Workout::NAME),
        }
    }
}

impl FromStr for PlanType {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diet" => Ok(Self::Diet),
            "workout" => Ok(Self::Workout),
            _ => Err(CoachError::validation("Type required (diet/workout)")),
        }
    }
}
