//! Expansion of stored tasks into dated occurrences for weekly/daily views.

use crate::model::goal::GoalId;
use crate::model::task::{Task, TaskId, TaskKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One dated entry shown by a schedule view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// Row to open when the entry is selected.
    pub task_id: TaskId,
    /// Owning series for recurring and detached entries.
    pub series_id: Option<TaskId>,
    pub date: NaiveDate,
    pub title: String,
    pub kind: TaskKind,
    pub goal_id: Option<GoalId>,
}

/// Expands `tasks` into occurrences dated within `[from, to]`.
///
/// `tasks` should include soft-deleted detached rows: a deleted override
/// still hides its series date.
pub fn expand_occurrences(tasks: &[Task], from: NaiveDate, to: NaiveDate) -> Vec<Occurrence> {
    let overridden: HashSet<(TaskId, NaiveDate)> = tasks
        .iter()
        .filter(|task| task.kind == TaskKind::Detached)
        .filter_map(|task| Some((task.parent_task_id?, task.occurrence_date?)))
        .collect();

    let mut items = Vec::new();
    for task in tasks.iter().filter(|task| task.is_active()) {
        match (task.kind, &task.recurrence) {
            (TaskKind::Recurring, Some(rule)) => {
                for date in rule.occurrences_between(task.scheduled_date, from, to) {
                    if overridden.contains(&(task.id, date)) {
                        continue;
                    }
                    items.push(Occurrence {
                        task_id: task.id,
                        series_id: Some(task.id),
                        date,
                        title: task.title.clone(),
                        kind: TaskKind::Recurring,
                        goal_id: task.goal_id,
                    });
                }
            }
            (TaskKind::Recurring, None) => {}
            (kind @ (TaskKind::OneTime | TaskKind::Detached), _) => {
                if task.scheduled_date < from || task.scheduled_date > to {
                    continue;
                }
                items.push(Occurrence {
                    task_id: task.id,
                    series_id: task.parent_task_id,
                    date: task.scheduled_date,
                    title: task.title.clone(),
                    kind,
                    goal_id: task.goal_id,
                });
            }
        }
    }

    items.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    items
}
