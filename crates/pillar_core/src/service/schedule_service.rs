//! Dated occurrence listing for the weekly and daily views.

use crate::model::occurrence::{expand_occurrences, Occurrence};
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::Visibility;
use crate::service::error::ServiceResult;
use crate::session::GoalSelection;
use chrono::NaiveDate;

pub struct ScheduleService<R> {
    repo: R,
}

impl<R: TaskRepository> ScheduleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists occurrences within `[from, to]`, filtered by the selection.
    pub fn list_occurrences(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        selection: &GoalSelection,
    ) -> ServiceResult<Vec<Occurrence>> {
        if to < from {
            return Ok(Vec::new());
        }
        // Overrides hide series dates even when deleted or moved out of range,
        // so only one-time tasks are narrowed to the window.
        let tasks = self.repo.list_tasks(&TaskListQuery {
            one_time_between: Some((from, to)),
            visibility: Visibility::All,
            ..TaskListQuery::default()
        })?;
        Ok(selection.filter_occurrences(expand_occurrences(&tasks, from, to)))
    }
}
