//! Scoped edits of recurring series.
//!
//! # Responsibility
//! - Load a series snapshot, plan a `this`/`future` edit and apply it.
//!
//! # Invariants
//! - The plan carries the snapshot's version; a concurrent write between
//!   load and apply surfaces as `Conflict` with nothing written.

use crate::clock::Clock;
use crate::model::item::ItemRef;
use crate::model::task::{Task, TaskId};
use crate::model::validation::ValidationError;
use crate::repo::change_set_repo::ChangeSetRepository;
use crate::repo::task_repo::TaskRepository;
use crate::scope::{plan_edit, EditScope, TaskChanges};
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Scoped edit of one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceEditRequest {
    pub task_id: TaskId,
    pub occurrence_date: NaiveDate,
    pub scope: EditScope,
    pub changes: TaskChanges,
}

/// Rows written by a scoped edit, as they read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEdit {
    pub updated: Vec<Task>,
    pub created: Vec<Task>,
    pub removed: Vec<TaskId>,
}

pub struct RecurrenceService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R> RecurrenceService<R>
where
    R: TaskRepository + ChangeSetRepository,
{
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Applies `request` to its series.
    ///
    /// # Errors
    /// - `NotFound` when the series is missing or deleted.
    /// - `Validation` when the task is not recurring, the date is not one
    ///   of its occurrences, or the changes do not fit the scope.
    /// - `Conflict` when the series changed concurrently.
    pub fn resolve_edit(&self, request: &RecurrenceEditRequest) -> ServiceResult<ResolvedEdit> {
        let started_at = Instant::now();
        let series = self
            .repo
            .get_task(request.task_id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Task(request.task_id)))?;
        if !series.is_recurring() {
            return Err(ValidationError::NotRecurring(series.id).into());
        }
        let overrides = self.repo.list_overrides(series.id)?;

        let plan = plan_edit(
            &series,
            &overrides,
            request.occurrence_date,
            request.scope,
            &request.changes,
            &mut Uuid::new_v4,
            self.clock.now_ms(),
        )?;

        if let Err(err) = self.repo.apply_change_set(&plan.change_set) {
            warn!(
                "event=recurrence_edit module=recurrence status=error scope={} error={}",
                request.scope.as_str(),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=recurrence_edit module=recurrence status=ok scope={} updated={} created={} removed={} duration_ms={}",
            request.scope.as_str(),
            plan.updated.len(),
            plan.created.len(),
            plan.removed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ResolvedEdit {
            updated: plan.updated,
            created: plan.created,
            removed: plan.removed,
        })
    }
}
