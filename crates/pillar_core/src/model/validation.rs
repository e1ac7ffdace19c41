//! Validation failures raised by model shape checks and scoped edits.

use crate::model::goal::{GoalId, GoalTier};
use crate::model::item::ItemRef;
use crate::model::task::{TaskId, TaskKind};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected input or state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is blank after trim.
    BlankTitle,
    /// Vision pillar is blank after trim.
    BlankPillar,
    /// A `three_year` goal carries a parent goal.
    UnexpectedParentGoal(GoalId),
    /// A lower-tier goal has no parent goal.
    MissingParentGoal { tier: GoalTier },
    /// Parent goal is not exactly one tier above the child.
    ParentTierMismatch { tier: GoalTier, parent_tier: GoalTier },
    /// Child goal references a different vision than its parent.
    VisionMismatch { goal_id: GoalId },
    /// Parent item does not exist or is soft-deleted.
    InactiveParent(ItemRef),
    /// Recurrence rule presence disagrees with task kind.
    RecurrenceKindMismatch { kind: TaskKind },
    /// Parent task / occurrence linkage disagrees with task kind.
    SeriesLinkMismatch { kind: TaskKind },
    /// Recurrence interval must be at least one.
    InvalidInterval(u32),
    /// Recurrence ends before it starts.
    UntilBeforeStart { start: NaiveDate, until: NaiveDate },
    /// Date lies outside the series' defined range.
    OccurrenceOutOfRange { task_id: TaskId, date: NaiveDate },
    /// Date is inside the range but not on the series cadence.
    NotAnOccurrence { task_id: TaskId, date: NaiveDate },
    /// Occurrence already has a detached override; edit that task instead.
    OccurrenceAlreadyDetached { task_id: TaskId, date: NaiveDate },
    /// Scoped edits only apply to recurring series.
    NotRecurring(TaskId),
    /// Recurring series must be edited through a scoped edit.
    ScopeRequired(TaskId),
    /// `this` scope cannot change the recurrence rule.
    RecurrenceChangeNeedsFutureScope,
    /// `future` scope cannot move the new series before the split date.
    StartBeforeSplit { start: NaiveDate, split: NaiveDate },
    /// `future` scope cannot extend a series past its existing end.
    UntilBeyondSeries {
        task_id: TaskId,
        series_until: NaiveDate,
        until: Option<NaiveDate>,
    },
    /// Item's parent must be restored before the item itself.
    RestoreParentFirst { item: ItemRef, parent: ItemRef },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::BlankPillar => write!(f, "pillar must not be blank"),
            Self::UnexpectedParentGoal(id) => {
                write!(f, "three-year goal cannot have a parent goal: {id}")
            }
            Self::MissingParentGoal { tier } => {
                write!(f, "{} goal requires a parent goal", tier.as_str())
            }
            Self::ParentTierMismatch { tier, parent_tier } => write!(
                f,
                "{} goal cannot be nested under a {} goal",
                tier.as_str(),
                parent_tier.as_str()
            ),
            Self::VisionMismatch { goal_id } => {
                write!(f, "goal {goal_id} must share its parent's vision")
            }
            Self::InactiveParent(item) => write!(f, "parent {item} is missing or deleted"),
            Self::RecurrenceKindMismatch { kind } => write!(
                f,
                "{} task has inconsistent recurrence rule",
                kind.as_str()
            ),
            Self::SeriesLinkMismatch { kind } => {
                write!(f, "{} task has inconsistent series linkage", kind.as_str())
            }
            Self::InvalidInterval(value) => {
                write!(f, "recurrence interval must be >= 1, got {value}")
            }
            Self::UntilBeforeStart { start, until } => {
                write!(f, "recurrence ends {until} before it starts {start}")
            }
            Self::OccurrenceOutOfRange { task_id, date } => {
                write!(f, "{date} is outside the range of series {task_id}")
            }
            Self::NotAnOccurrence { task_id, date } => {
                write!(f, "{date} is not an occurrence of series {task_id}")
            }
            Self::OccurrenceAlreadyDetached { task_id, date } => write!(
                f,
                "occurrence {date} of series {task_id} is already detached"
            ),
            Self::NotRecurring(id) => write!(f, "task is not recurring: {id}"),
            Self::ScopeRequired(id) => {
                write!(f, "recurring task {id} must be edited with a scope")
            }
            Self::RecurrenceChangeNeedsFutureScope => {
                write!(f, "recurrence changes require the `future` scope")
            }
            Self::StartBeforeSplit { start, split } => {
                write!(f, "new series start {start} is before split date {split}")
            }
            Self::UntilBeyondSeries {
                task_id,
                series_until,
                until: Some(until),
            } => write!(
                f,
                "series {task_id} ends {series_until}; cannot extend it to {until}"
            ),
            Self::UntilBeyondSeries {
                task_id,
                series_until,
                until: None,
            } => write!(
                f,
                "series {task_id} ends {series_until}; cannot make it open-ended"
            ),
            Self::RestoreParentFirst { item, parent } => {
                write!(f, "restore {parent} before restoring {item}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims a user-facing title and rejects blank values.
pub fn normalize_title(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    Ok(trimmed.to_string())
}
