//! Core of the Pillar goal planner.
//! Owns the hierarchy invariants, scoped recurrence edits, and the item
//! lifecycle; callers only see typed results.

pub mod auth;
pub mod breadcrumb;
pub mod clock;
pub mod config;
pub mod db;
pub mod example_gen;
pub mod logging;
pub mod model;
pub mod onboarding;
pub mod prompt;
pub mod repo;
pub mod scope;
pub mod service;
pub mod session;

pub use auth::{bearer_token, token_fingerprint, AuthError, IdentityVerifier, UserIdentity};
pub use breadcrumb::{project, BreadcrumbItem, Emphasis, Segment};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LifecycleConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use example_gen::{ExampleGenerator, ExampleRequest, UpstreamError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::goal::{Goal, GoalId, GoalStatus, GoalTier};
pub use model::item::{ItemRef, ItemType};
pub use model::occurrence::Occurrence;
pub use model::recurrence::{Frequency, RecurrenceRule};
pub use model::task::{Task, TaskId, TaskKind};
pub use model::validation::ValidationError;
pub use model::vision::{Vision, VisionId};
pub use repo::{RepoError, RepoResult, SqlitePlannerRepository};
pub use scope::{EditScope, TaskChanges};
pub use service::error::{ServiceError, ServiceResult};
pub use service::hierarchy_service::HierarchyService;
pub use service::lifecycle_service::{DeleteReceipt, DeleteTarget, LifecycleService};
pub use service::recurrence_service::{RecurrenceEditRequest, RecurrenceService, ResolvedEdit};
pub use service::schedule_service::ScheduleService;
pub use service::undo::UndoToken;
pub use session::{GoalSelection, Session, StatusFilter, ViewFilters};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
