//! Task repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Recurrence rules are stored as three nullable columns that are either
//!   all set (recurring) or all null.
//! - Detached overrides are unique per `(parent_task_id, occurrence_date)`.

use super::codec::{
    bool_to_int, format_date, parse_date, parse_optional_date, parse_optional_uuid, parse_uuid,
    placeholders,
};
use super::{RepoError, RepoResult, SqlitePlannerRepository, Visibility};
use crate::model::goal::GoalId;
use crate::model::recurrence::{Frequency, RecurrenceRule};
use crate::model::task::{Task, TaskId, TaskKind};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub(crate) const TASK_SELECT_SQL: &str = "SELECT
    id,
    goal_id,
    parent_task_id,
    kind,
    title,
    scheduled_date,
    occurrence_date,
    recurrence_frequency,
    recurrence_interval,
    recurrence_until,
    version,
    created_at,
    deleted_at
FROM tasks";

/// Query options for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskListQuery {
    /// Restrict to tasks attached to any of these goals.
    pub goal_ids: Option<Vec<GoalId>>,
    pub kind: Option<TaskKind>,
    /// Keep one-time tasks only when dated within this inclusive range;
    /// series and overrides are unaffected.
    pub one_time_between: Option<(NaiveDate, NaiveDate)>,
    pub visibility: Visibility,
}

/// Repository interface for task reads and single-row creation.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Lists every detached override of one series, deleted ones included.
    fn list_overrides(&self, series_id: TaskId) -> RepoResult<Vec<Task>>;
}

impl TaskRepository for SqlitePlannerRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        insert_task(self.conn, task)?;
        Ok(task.id)
    }

    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>> {
        load_task(self.conn, id, include_deleted)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!(
            "{TASK_SELECT_SQL} WHERE 1 = 1{}",
            query.visibility.sql_clause("deleted_at")
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(goal_ids) = &query.goal_ids {
            if goal_ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND goal_id IN ({})", placeholders(goal_ids.len())));
            bind_values.extend(goal_ids.iter().map(|id| Value::Text(id.to_string())));
        }
        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some((from, to)) = query.one_time_between {
            sql.push_str(" AND (kind <> ? OR scheduled_date BETWEEN ? AND ?)");
            bind_values.push(Value::Text(TaskKind::OneTime.as_str().to_string()));
            bind_values.push(Value::Text(format_date(from)));
            bind_values.push(Value::Text(format_date(to)));
        }
        sql.push_str(" ORDER BY scheduled_date ASC, created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn list_overrides(&self, series_id: TaskId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE parent_task_id = ?1
               AND kind = 'detached'
             ORDER BY occurrence_date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([series_id.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    let (frequency, interval, until) = rule_columns(task.recurrence.as_ref());
    conn.execute(
        "INSERT INTO tasks (
            id,
            goal_id,
            parent_task_id,
            kind,
            title,
            scheduled_date,
            occurrence_date,
            recurrence_frequency,
            recurrence_interval,
            recurrence_until,
            version,
            created_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            task.id.to_string(),
            task.goal_id.map(|value| value.to_string()),
            task.parent_task_id.map(|value| value.to_string()),
            task.kind.as_str(),
            task.title.as_str(),
            format_date(task.scheduled_date),
            task.occurrence_date.map(format_date),
            frequency,
            interval,
            until,
            task.version,
            task.created_at,
            task.deleted_at,
        ],
    )?;
    Ok(())
}

/// Inserts or overwrites one task row. Existing rows keep their `version`;
/// callers bump it through a version guard.
pub(crate) fn upsert_task(conn: &Connection, task: &Task) -> RepoResult<()> {
    let (frequency, interval, until) = rule_columns(task.recurrence.as_ref());
    conn.execute(
        "INSERT INTO tasks (
            id,
            goal_id,
            parent_task_id,
            kind,
            title,
            scheduled_date,
            occurrence_date,
            recurrence_frequency,
            recurrence_interval,
            recurrence_until,
            version,
            created_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(id) DO UPDATE SET
            goal_id = excluded.goal_id,
            parent_task_id = excluded.parent_task_id,
            kind = excluded.kind,
            title = excluded.title,
            scheduled_date = excluded.scheduled_date,
            occurrence_date = excluded.occurrence_date,
            recurrence_frequency = excluded.recurrence_frequency,
            recurrence_interval = excluded.recurrence_interval,
            recurrence_until = excluded.recurrence_until,
            deleted_at = excluded.deleted_at,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            task.id.to_string(),
            task.goal_id.map(|value| value.to_string()),
            task.parent_task_id.map(|value| value.to_string()),
            task.kind.as_str(),
            task.title.as_str(),
            format_date(task.scheduled_date),
            task.occurrence_date.map(format_date),
            frequency,
            interval,
            until,
            task.version,
            task.created_at,
            task.deleted_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn load_task(
    conn: &Connection,
    id: TaskId,
    include_deleted: bool,
) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn rule_columns(rule: Option<&RecurrenceRule>) -> (Option<&'static str>, Option<i64>, Option<String>) {
    match rule {
        Some(rule) => (
            Some(rule.frequency.as_str()),
            Some(i64::from(rule.interval)),
            rule.until.map(format_date),
        ),
        None => (None, None, None),
    }
}

pub(crate) fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;

    let kind_text: String = row.get("kind")?;
    let kind = TaskKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task kind `{kind_text}` in tasks.kind"))
    })?;

    let scheduled_text: String = row.get("scheduled_date")?;

    let recurrence = match row.get::<_, Option<String>>("recurrence_frequency")? {
        Some(frequency_text) => {
            let frequency = Frequency::parse(&frequency_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid frequency `{frequency_text}` in tasks.recurrence_frequency"
                ))
            })?;
            let interval: i64 = row
                .get::<_, Option<i64>>("recurrence_interval")?
                .ok_or_else(|| {
                    RepoError::InvalidData(
                        "missing tasks.recurrence_interval for recurring task".to_string(),
                    )
                })?;
            let interval = u32::try_from(interval).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid interval `{interval}` in tasks.recurrence_interval"
                ))
            })?;
            Some(RecurrenceRule {
                frequency,
                interval,
                until: parse_optional_date(
                    row.get("recurrence_until")?,
                    "tasks.recurrence_until",
                )?,
            })
        }
        None => None,
    };

    let task = Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        title: row.get("title")?,
        goal_id: parse_optional_uuid(row.get("goal_id")?, "tasks.goal_id")?,
        scheduled_date: parse_date(&scheduled_text, "tasks.scheduled_date")?,
        recurrence,
        parent_task_id: parse_optional_uuid(row.get("parent_task_id")?, "tasks.parent_task_id")?,
        occurrence_date: parse_optional_date(row.get("occurrence_date")?, "tasks.occurrence_date")?,
        kind,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    task.validate()?;
    Ok(task)
}
