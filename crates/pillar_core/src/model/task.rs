//! Task records: one-time tasks, recurring series, and detached occurrences.
//!
//! # Invariants
//! - `recurrence.is_some()` iff `kind == Recurring`.
//! - `Detached` tasks always name their series (`parent_task_id`) and the
//!   series date they stand in for (`occurrence_date`).
//! - `version` only moves forward; every write to an existing row bumps it.

use crate::model::goal::GoalId;
use crate::model::recurrence::{OccurrenceMiss, RecurrenceRule};
use crate::model::validation::{normalize_title, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Series definition carrying a recurrence rule.
    Recurring,
    /// Single dated task.
    OneTime,
    /// Occurrence split off a series by a `this`-scoped edit or delete.
    Detached,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recurring => "recurring",
            Self::OneTime => "one_time",
            Self::Detached => "detached",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recurring" => Some(Self::Recurring),
            "one_time" => Some(Self::OneTime),
            "detached" => Some(Self::Detached),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub goal_id: Option<GoalId>,
    /// Due date; for a series this is the first occurrence.
    pub scheduled_date: NaiveDate,
    pub recurrence: Option<RecurrenceRule>,
    /// Series this detached occurrence was split from.
    pub parent_task_id: Option<TaskId>,
    /// Series date this detached occurrence replaces.
    pub occurrence_date: Option<NaiveDate>,
    pub kind: TaskKind,
    /// Optimistic concurrency counter.
    pub version: i64,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl Task {
    pub fn one_time(title: impl Into<String>, date: NaiveDate, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            goal_id: None,
            scheduled_date: date,
            recurrence: None,
            parent_task_id: None,
            occurrence_date: None,
            kind: TaskKind::OneTime,
            version: 0,
            created_at,
            deleted_at: None,
        }
    }

    pub fn recurring(
        title: impl Into<String>,
        start: NaiveDate,
        rule: RecurrenceRule,
        created_at: i64,
    ) -> Self {
        Self {
            recurrence: Some(rule),
            kind: TaskKind::Recurring,
            ..Self::one_time(title, start, created_at)
        }
    }

    pub fn with_goal(mut self, goal_id: GoalId) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_title(&self.title)?;
        let kind = self.kind;
        let linked = (self.parent_task_id.is_some(), self.occurrence_date.is_some());
        match kind {
            TaskKind::Recurring => {
                let rule = self
                    .recurrence
                    .as_ref()
                    .ok_or(ValidationError::RecurrenceKindMismatch { kind })?;
                if linked != (false, false) {
                    return Err(ValidationError::SeriesLinkMismatch { kind });
                }
                rule.validate(self.scheduled_date)
            }
            TaskKind::OneTime | TaskKind::Detached => {
                if self.recurrence.is_some() {
                    return Err(ValidationError::RecurrenceKindMismatch { kind });
                }
                let expected = kind == TaskKind::Detached;
                if linked != (expected, expected) {
                    return Err(ValidationError::SeriesLinkMismatch { kind });
                }
                Ok(())
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_recurring(&self) -> bool {
        self.kind == TaskKind::Recurring
    }

    /// Fails unless `date` is an occurrence of this series.
    pub fn check_occurrence(&self, date: NaiveDate) -> Result<(), ValidationError> {
        let rule = match (&self.recurrence, self.kind) {
            (Some(rule), TaskKind::Recurring) => rule,
            _ => return Err(ValidationError::NotRecurring(self.id)),
        };
        match rule.position(self.scheduled_date, date) {
            Ok(_) => Ok(()),
            Err(OccurrenceMiss::OutOfRange) => Err(ValidationError::OccurrenceOutOfRange {
                task_id: self.id,
                date,
            }),
            Err(OccurrenceMiss::OffCadence) => Err(ValidationError::NotAnOccurrence {
                task_id: self.id,
                date,
            }),
        }
    }

    /// Clones this series into a detached occurrence at `date`.
    pub fn detach_at(&self, id: TaskId, date: NaiveDate, created_at: i64) -> Task {
        Task {
            id,
            title: self.title.clone(),
            goal_id: self.goal_id,
            scheduled_date: date,
            recurrence: None,
            parent_task_id: Some(self.id),
            occurrence_date: Some(date),
            kind: TaskKind::Detached,
            version: 0,
            created_at,
            deleted_at: None,
        }
    }
}
