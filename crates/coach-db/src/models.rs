use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Trainer,
    GymOwner,
}

impl Role {
    /// Trainers and gym owners manage clients, plans and templates.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Trainer | Self::GymOwner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Client => "client",
            Self::Trainer => "trainer",
            Self::GymOwner => "gym_owner",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "trainer" => Ok(Self::Trainer),
            "gym_owner" => Ok(Self::GymOwner),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Role`] string.
#[derive(Debug, Clone)]
pub struct RoleParseError(pub String);

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: {:?}", self.0)
    }
}

impl std::error::Error for RoleParseError {}

// ---------------------------------------------------------------------------

/// Day of the week a plan item is scheduled on.
///
/// Stored in its canonical English form ("Monday" .. "Sunday"). Parsing is
/// case- and whitespace-insensitive so hand-typed or extracted plans with
/// "  monday" or "FRIDAY" land on the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum DayName {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayName {
    pub const ALL: [DayName; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// The weekday a calendar date falls on.
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for DayName {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        };
        f.write_str(s)
    }
}

impl FromStr for DayName {
    type Err = DayNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DayNameParseError(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for DayName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing an invalid [`DayName`] string.
#[derive(Debug, Clone)]
pub struct DayNameParseError(pub String);

impl fmt::Display for DayNameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid day name: {:?}", self.0)
    }
}

impl std::error::Error for DayNameParseError {}

// ---------------------------------------------------------------------------

/// Category of an exercise. Cardio completions carry photo evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ExerciseCategory {
    #[default]
    Strength,
    Cardio,
    Stretching,
    Other,
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strength => "STRENGTH",
            Self::Cardio => "CARDIO",
            Self::Stretching => "STRETCHING",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

impl FromStr for ExerciseCategory {
    type Err = ExerciseCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRENGTH" => Ok(Self::Strength),
            "CARDIO" => Ok(Self::Cardio),
            "STRETCHING" => Ok(Self::Stretching),
            "OTHER" => Ok(Self::Other),
            _ => Err(ExerciseCategoryParseError(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for ExerciseCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing an invalid [`ExerciseCategory`] string.
#[derive(Debug, Clone)]
pub struct ExerciseCategoryParseError(pub String);

impl fmt::Display for ExerciseCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid exercise category: {:?}", self.0)
    }
}

impl std::error::Error for ExerciseCategoryParseError {}

// ---------------------------------------------------------------------------

/// Derived entitlement status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
    Inactive,
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A user row. Clients carry session credits and an optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub trainer_id: Option<Uuid>,
    pub total_sessions: i32,
    pub completed_sessions: i32,
    pub validity_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Active iff credits remain and the entitlement has not expired.
    pub fn status_at(&self, now: DateTime<Utc>) -> ClientStatus {
        let has_credits = self.total_sessions - self.completed_sessions > 0;
        let unexpired = self.validity_expires_at.is_none_or(|expiry| expiry > now);
        if has_credits && unexpired {
            ClientStatus::Active
        } else {
            ClientStatus::Inactive
        }
    }
}

/// A dated version of a client's diet or workout plan.
///
/// `followed_till = None` marks the open ("current") version.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanVersion {
    pub id: Uuid,
    pub client_id: Uuid,
    pub created_by_trainer_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub followed_from: NaiveDate,
    pub followed_till: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanVersion {
    pub fn is_current(&self) -> bool {
        self.followed_till.is_none()
    }

    /// Whether the inclusive effective range contains `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.followed_from <= date && self.followed_till.is_none_or(|till| till >= date)
    }
}

/// One row of a client's version history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VersionSummary {
    pub id: Uuid,
    pub title: String,
    pub followed_from: NaiveDate,
    pub followed_till: Option<NaiveDate>,
    pub is_current: bool,
}

/// A meal line item, read from either a plan version or a diet template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub day_name: Option<DayName>,
    pub meal_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub calories_kcal: f64,
    pub order_index: i32,
}

/// Incoming meal fields. Macros default to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMeal {
    pub day_name: Option<DayName>,
    pub meal_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub calories_kcal: Option<f64>,
}

impl From<&Meal> for NewMeal {
    fn from(meal: &Meal) -> Self {
        Self {
            day_name: meal.day_name,
            meal_type: meal.meal_type.clone(),
            name: meal.name.clone(),
            description: meal.description.clone(),
            protein_g: Some(meal.protein_g),
            carbs_g: Some(meal.carbs_g),
            fat_g: Some(meal.fat_g),
            calories_kcal: Some(meal.calories_kcal),
        }
    }
}

/// An exercise line item, read from either a plan version or a workout
/// template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub day_name: DayName,
    pub name: String,
    pub category: ExerciseCategory,
    pub sets: Option<i32>,
    pub reps: Option<String>,
    pub duration: Option<String>,
    pub notes: Option<String>,
    pub order_index: i32,
}

/// Incoming exercise fields. The day defaults to Monday and the category to
/// strength.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewExercise {
    pub day_name: Option<DayName>,
    pub name: String,
    pub category: Option<ExerciseCategory>,
    pub sets: Option<i32>,
    pub reps: Option<String>,
    pub duration: Option<String>,
    pub notes: Option<String>,
}

impl From<&Exercise> for NewExercise {
    fn from(exercise: &Exercise) -> Self {
        Self {
            day_name: Some(exercise.day_name),
            name: exercise.name.clone(),
            category: Some(exercise.category),
            sets: exercise.sets,
            reps: exercise.reps.clone(),
            duration: exercise.duration.clone(),
            notes: exercise.notes.clone(),
        }
    }
}

/// A record that a client performed a line item on a date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Completion {
    pub id: Uuid,
    pub client_id: Uuid,
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub evidence_url: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// A reusable, date-less plan blueprint owned by a trainer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A template row plus the number of items it holds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub template: Template,
    pub item_count: i64,
}

/// A meal the user logged as eaten.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub meal_type: String,
    pub foods_detected: Vec<String>,
    pub calories_est: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Incoming meal-log fields. A missing date means today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMealLog {
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_clock_time")]
    pub time: Option<NaiveTime>,
    pub meal_type: String,
    pub foods_detected: Vec<String>,
    pub calories_est: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

/// Accepts `HH:MM` as well as `HH:MM:SS`. Blank means absent.
fn deserialize_clock_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("invalid time {raw:?}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
