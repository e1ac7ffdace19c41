//! Planner storage: the `visions`, `goals` and `tasks` tables.
//!
//! # Responsibility
//! - Hand repositories a connection whose schema carries the hierarchy
//!   foreign keys, the per-task `version` column read by change-set guards,
//!   and the `(parent_task_id, occurrence_date)` uniqueness of overrides.
//! - Report which planner migration failed when an upgrade cannot apply.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied planner migration.
//! - `foreign_keys` is on for every returned connection; soft deletes keep
//!   rows in place, so restore never has to re-link parents.
//! - Change sets run on these connections inside `BEGIN IMMEDIATE`, so a
//!   guard read and its version bump cannot interleave with another writer.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A planner migration failed; none of the pending migrations applied.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "planner migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "planner schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
