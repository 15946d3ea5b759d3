//! Versioned plans: the write path and history reads ([`store`]) and
//! date-to-items resolution ([`resolver`]).

pub mod resolver;
pub mod store;

pub use resolver::{DayGroup, ResolvedItem, resolve_for_date, resolve_for_range};
pub use store::{
    PlanWithItems, VersionDraft, create_version, create_version_on, get_current, get_history,
    get_version,
};
