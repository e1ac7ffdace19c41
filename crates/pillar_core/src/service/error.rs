//! Error type shared by planner services.

use crate::model::item::ItemRef;
use crate::model::task::TaskId;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use crate::service::undo::UndoToken;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from hierarchy, recurrence and lifecycle operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Input or state transition was rejected; nothing was written.
    Validation(ValidationError),
    /// Item does not exist, or is not visible to the operation.
    NotFound(ItemRef),
    /// Undo token is unknown, already used, or outside its window.
    ExpiredToken(UndoToken),
    /// A task changed between planning and applying; nothing was written.
    Conflict(TaskId),
    /// Storage failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(item) => write!(f, "{item} not found"),
            Self::ExpiredToken(token) => write!(f, "undo token expired: {token}"),
            Self::Conflict(task_id) => {
                write!(f, "task {task_id} was modified concurrently; reload and retry")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::ExpiredToken(_) | Self::Conflict(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(item) => Self::NotFound(item),
            RepoError::VersionConflict { task_id, .. } => Self::Conflict(task_id),
            other => Self::Repo(other),
        }
    }
}
