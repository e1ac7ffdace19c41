//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate model shape before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Multi-row mutations go through `ChangeSetRepository` in one transaction.

use crate::db::DbError;
use crate::model::item::ItemRef;
use crate::model::task::TaskId;
use crate::model::validation::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod change_set_repo;
mod codec;
pub mod hierarchy_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for planner persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(ItemRef),
    /// Optimistic version check failed; the row changed or vanished.
    VersionConflict {
        task_id: TaskId,
        expected: i64,
        actual: Option<i64>,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(item) => write!(f, "{item} not found"),
            Self::VersionConflict {
                task_id,
                expected,
                actual: Some(actual),
            } => write!(
                f,
                "task {task_id} changed concurrently: expected version {expected}, found {actual}"
            ),
            Self::VersionConflict {
                task_id,
                expected,
                actual: None,
            } => write!(
                f,
                "task {task_id} vanished: expected version {expected}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted planner data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::VersionConflict { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Tombstone filter for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Active,
    Deleted,
    All,
}

impl Visibility {
    fn sql_clause(self, column: &str) -> String {
        match self {
            Self::Active => format!(" AND {column} IS NULL"),
            Self::Deleted => format!(" AND {column} IS NOT NULL"),
            Self::All => String::new(),
        }
    }
}

/// SQLite-backed planner repository.
///
/// One value implements every repository trait so services can share a
/// connection and compose reads with change-set writes.
#[derive(Clone, Copy)]
pub struct SqlitePlannerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlannerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }
}
