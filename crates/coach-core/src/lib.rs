//! Domain operations for the coaching backend.
//!
//! Every operation takes its storage handle explicitly. Operations that
//! write more than one row accept any [`sqlx::Acquire`] and open their own
//! transaction on it, so passing a pool, a connection or an outer
//! transaction all work.

pub mod auth;
pub mod blob;
pub mod completion;
pub mod error;
pub mod extract;
pub mod kind;
pub mod meal_log;
pub mod plan;
pub mod session;
pub mod template;

pub use error::{CoachError, CoachResult};
pub use kind::{Diet, PlanKind, PlanType, Workout};
