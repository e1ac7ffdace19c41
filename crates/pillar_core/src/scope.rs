//! Scope planning for edits and deletes on recurring series.
//!
//! # Responsibility
//! - Turn a `this`/`future` request on one occurrence into a `ChangeSet`.
//! - Stay pure: inputs are loaded rows, an id source, and a timestamp.
//!
//! # Invariants
//! - `this` never rewrites the series row; it only bumps its version.
//! - `future` at date D leaves the original covering dates `< D` and a new
//!   series covering `>= D`, so no date belongs to two series.
//! - A split at the first occurrence drops the original instead of leaving
//!   a zero-length series.
//! - A `future` edit never pushes `until` past the series' current end; a
//!   truncated series may already have a successor after that date.

use crate::model::goal::GoalId;
use crate::model::recurrence::Frequency;
use crate::model::task::{Task, TaskId};
use crate::model::validation::{normalize_title, ValidationError};
use crate::repo::change_set_repo::ChangeSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Range of occurrences an edit or delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Only the selected occurrence.
    This,
    /// The selected occurrence and every later one.
    Future,
}

impl EditScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::This => "this",
            Self::Future => "future",
        }
    }
}

/// Partial field set for task edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    pub title: Option<String>,
    /// `Some(None)` detaches the task from its goal.
    pub goal_id: Option<Option<GoalId>>,
    pub scheduled_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    /// `Some(None)` makes the series open-ended.
    pub until: Option<Option<NaiveDate>>,
}

impl TaskChanges {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn touches_recurrence(&self) -> bool {
        self.frequency.is_some() || self.interval.is_some() || self.until.is_some()
    }

    /// Applies title, goal and date fields.
    pub fn apply_details(&self, task: &mut Task) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            task.title = normalize_title(title)?;
        }
        if let Some(goal_id) = self.goal_id {
            task.goal_id = goal_id;
        }
        if let Some(date) = self.scheduled_date {
            task.scheduled_date = date;
        }
        Ok(())
    }

    fn apply_rule(&self, task: &mut Task) {
        if let Some(rule) = task.recurrence.as_mut() {
            if let Some(frequency) = self.frequency {
                rule.frequency = frequency;
            }
            if let Some(interval) = self.interval {
                rule.interval = interval;
            }
            if let Some(until) = self.until {
                rule.until = until;
            }
        }
    }
}

/// Planned outcome of a scoped request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopePlan {
    pub change_set: ChangeSet,
    /// Existing rows as they read after the write.
    pub updated: Vec<Task>,
    pub created: Vec<Task>,
    pub removed: Vec<TaskId>,
    /// Row that represents the request's result to the caller.
    pub primary: Option<TaskId>,
}

impl ScopePlan {
    /// Bumps the row's version without rewriting it.
    fn touch(&mut self, task: &Task) {
        self.change_set.guard(task);
    }

    /// `task` carries the loaded version; the guard checks and bumps it.
    fn update(&mut self, task: Task) {
        self.change_set.guard(&task);
        self.change_set.tasks.push(task.clone());
        self.updated.push(Task {
            version: task.version + 1,
            ..task
        });
    }

    fn create(&mut self, task: Task) {
        self.change_set.tasks.push(task.clone());
        self.created.push(task);
    }

    fn remove(&mut self, task: &Task) {
        self.change_set.guard(task);
        self.change_set.removed_tasks.push(task.id);
        self.removed.push(task.id);
    }
}

/// Plans a scoped edit of one occurrence of `series`.
///
/// `overrides` must hold every detached row of the series, deleted ones
/// included.
pub fn plan_edit(
    series: &Task,
    overrides: &[Task],
    occurrence: NaiveDate,
    scope: EditScope,
    changes: &TaskChanges,
    next_id: &mut impl FnMut() -> TaskId,
    now_ms: i64,
) -> Result<ScopePlan, ValidationError> {
    ensure_scoped_target(series, overrides, occurrence)?;
    let mut plan = ScopePlan::default();

    match scope {
        EditScope::This => {
            if changes.touches_recurrence() {
                return Err(ValidationError::RecurrenceChangeNeedsFutureScope);
            }
            let mut detached = series.detach_at(next_id(), occurrence, now_ms);
            changes.apply_details(&mut detached)?;
            detached.validate()?;

            plan.primary = Some(detached.id);
            plan.touch(series);
            plan.create(detached);
        }
        EditScope::Future => {
            let start = changes.scheduled_date.unwrap_or(occurrence);
            if start < occurrence {
                return Err(ValidationError::StartBeforeSplit {
                    start,
                    split: occurrence,
                });
            }

            let mut tail = successor(series, next_id(), occurrence, now_ms);
            changes.apply_details(&mut tail)?;
            changes.apply_rule(&mut tail);
            tail.validate()?;
            ensure_within_series_end(series, &tail)?;

            plan.primary = Some(tail.id);
            split_series(&mut plan, series, overrides, occurrence, tail, None)?;
        }
    }

    Ok(plan)
}

/// Plans a scoped delete of one occurrence of `series`.
pub fn plan_delete(
    series: &Task,
    overrides: &[Task],
    occurrence: NaiveDate,
    scope: EditScope,
    next_id: &mut impl FnMut() -> TaskId,
    now_ms: i64,
) -> Result<ScopePlan, ValidationError> {
    ensure_scoped_target(series, overrides, occurrence)?;

    match scope {
        EditScope::This => {
            let mut plan = ScopePlan::default();
            let mut tombstone = series.detach_at(next_id(), occurrence, now_ms);
            tombstone.deleted_at = Some(now_ms);

            plan.primary = Some(tombstone.id);
            plan.touch(series);
            plan.create(tombstone);
            Ok(plan)
        }
        EditScope::Future if occurrence == series.scheduled_date => {
            Ok(plan_series_delete(series, overrides, now_ms))
        }
        EditScope::Future => {
            let mut plan = ScopePlan::default();
            let mut tail = successor(series, next_id(), occurrence, now_ms);
            tail.deleted_at = Some(now_ms);

            plan.primary = Some(tail.id);
            split_series(&mut plan, series, overrides, occurrence, tail, Some(now_ms))?;
            Ok(plan)
        }
    }
}

/// Plans a soft delete of a whole series and its active overrides.
pub fn plan_series_delete(series: &Task, overrides: &[Task], now_ms: i64) -> ScopePlan {
    let mut plan = ScopePlan {
        primary: Some(series.id),
        ..ScopePlan::default()
    };
    plan.update(Task {
        deleted_at: Some(now_ms),
        ..series.clone()
    });
    for detached in overrides.iter().filter(|task| task.is_active()) {
        plan.update(Task {
            deleted_at: Some(now_ms),
            ..detached.clone()
        });
    }
    plan
}

fn ensure_scoped_target(
    series: &Task,
    overrides: &[Task],
    occurrence: NaiveDate,
) -> Result<(), ValidationError> {
    series.check_occurrence(occurrence)?;
    if overrides
        .iter()
        .any(|task| task.occurrence_date == Some(occurrence))
    {
        return Err(ValidationError::OccurrenceAlreadyDetached {
            task_id: series.id,
            date: occurrence,
        });
    }
    Ok(())
}

/// A truncated series may be followed by a successor; the new tail must
/// not run past the original end.
fn ensure_within_series_end(series: &Task, tail: &Task) -> Result<(), ValidationError> {
    let series_until = series.recurrence.as_ref().and_then(|rule| rule.until);
    let tail_until = tail.recurrence.as_ref().and_then(|rule| rule.until);
    match (series_until, tail_until) {
        (Some(series_until), None) => Err(ValidationError::UntilBeyondSeries {
            task_id: series.id,
            series_until,
            until: None,
        }),
        (Some(series_until), Some(until)) if until > series_until => {
            Err(ValidationError::UntilBeyondSeries {
                task_id: series.id,
                series_until,
                until: Some(until),
            })
        }
        _ => Ok(()),
    }
}

/// New series definition continuing `series` from `start`.
fn successor(series: &Task, id: TaskId, start: NaiveDate, now_ms: i64) -> Task {
    Task {
        id,
        scheduled_date: start,
        version: 0,
        created_at: now_ms,
        deleted_at: None,
        ..series.clone()
    }
}

fn split_series(
    plan: &mut ScopePlan,
    series: &Task,
    overrides: &[Task],
    split: NaiveDate,
    tail: Task,
    tombstone_at: Option<i64>,
) -> Result<(), ValidationError> {
    let tail_id = tail.id;
    plan.create(tail);

    for detached in overrides
        .iter()
        .filter(|task| task.occurrence_date.is_some_and(|date| date >= split))
    {
        let mut moved = detached.clone();
        moved.parent_task_id = Some(tail_id);
        if let (Some(deleted_at), true) = (tombstone_at, moved.is_active()) {
            moved.deleted_at = Some(deleted_at);
        }
        plan.update(moved);
    }

    if split > series.scheduled_date {
        let last_kept = split
            .pred_opt()
            .ok_or(ValidationError::OccurrenceOutOfRange {
                task_id: series.id,
                date: split,
            })?;
        let mut truncated = series.clone();
        if let Some(rule) = truncated.recurrence.as_mut() {
            rule.until = Some(last_kept);
        }
        plan.update(truncated);
    } else {
        plan.remove(series);
    }
    Ok(())
}
