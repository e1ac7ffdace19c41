//! Atomic multi-row writes.
//!
//! # Responsibility
//! - Apply a planned set of row upserts and removals in one transaction.
//! - Enforce optimistic version guards on task rows before any write.
//!
//! # Invariants
//! - Guards run first; one stale guard aborts the whole change set.
//! - Every existing task row written by a change set must be guarded, since
//!   the guard is what bumps `version`.
//! - Upserts run before removals so re-parented rows never dangle.

use super::codec::bool_to_int;
use super::task_repo::upsert_task;
use super::{RepoError, RepoResult, SqlitePlannerRepository};
use crate::model::goal::Goal;
use crate::model::item::ItemRef;
use crate::model::task::{Task, TaskId};
use crate::model::vision::Vision;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Instant;

/// Expected version of one task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGuard {
    pub task_id: TaskId,
    pub expected_version: i64,
}

/// Planned mutation applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub task_guards: Vec<VersionGuard>,
    pub visions: Vec<Vision>,
    pub goals: Vec<Goal>,
    /// Upserted in order; series before the overrides that point at them.
    pub tasks: Vec<Task>,
    pub removed_tasks: Vec<TaskId>,
}

impl ChangeSet {
    pub fn guard(&mut self, task: &Task) {
        if self.task_guards.iter().any(|guard| guard.task_id == task.id) {
            return;
        }
        self.task_guards.push(VersionGuard {
            task_id: task.id,
            expected_version: task.version,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.task_guards.is_empty()
            && self.visions.is_empty()
            && self.goals.is_empty()
            && self.tasks.is_empty()
            && self.removed_tasks.is_empty()
    }
}

/// Repository interface for atomic change-set application.
pub trait ChangeSetRepository {
    fn apply_change_set(&self, changes: &ChangeSet) -> RepoResult<()>;
}

impl ChangeSetRepository for SqlitePlannerRepository<'_> {
    fn apply_change_set(&self, changes: &ChangeSet) -> RepoResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        match apply_in_transaction(self.conn, changes) {
            Ok(()) => {
                info!(
                    "event=change_set_apply module=repo status=ok guards={} visions={} goals={} tasks={} removed={} duration_ms={}",
                    changes.task_guards.len(),
                    changes.visions.len(),
                    changes.goals.len(),
                    changes.tasks.len(),
                    changes.removed_tasks.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=change_set_apply module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn apply_in_transaction(conn: &Connection, changes: &ChangeSet) -> RepoResult<()> {
    for vision in &changes.visions {
        vision.validate()?;
    }
    for goal in &changes.goals {
        goal.validate()?;
    }
    for task in &changes.tasks {
        task.validate()?;
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    for guard in &changes.task_guards {
        let actual: Option<i64> = tx
            .query_row(
                "SELECT version FROM tasks WHERE id = ?1;",
                [guard.task_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if actual != Some(guard.expected_version) {
            return Err(RepoError::VersionConflict {
                task_id: guard.task_id,
                expected: guard.expected_version,
                actual,
            });
        }
        tx.execute(
            "UPDATE tasks
             SET version = version + 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [guard.task_id.to_string()],
        )?;
    }

    for vision in &changes.visions {
        upsert_vision(&tx, vision)?;
    }
    for goal in &changes.goals {
        upsert_goal(&tx, goal)?;
    }
    for task in &changes.tasks {
        upsert_task(&tx, task)?;
    }
    for task_id in &changes.removed_tasks {
        let removed = tx.execute("DELETE FROM tasks WHERE id = ?1;", [task_id.to_string()])?;
        if removed == 0 {
            return Err(RepoError::NotFound(ItemRef::Task(*task_id)));
        }
    }

    tx.commit()?;
    Ok(())
}

fn upsert_vision(conn: &Connection, vision: &Vision) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO visions (
            id,
            pillar,
            title,
            description,
            created_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            pillar = excluded.pillar,
            title = excluded.title,
            description = excluded.description,
            deleted_at = excluded.deleted_at,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            vision.id.to_string(),
            vision.pillar.as_str(),
            vision.title.as_str(),
            vision.description.as_str(),
            vision.created_at,
            vision.deleted_at,
        ],
    )?;
    Ok(())
}

fn upsert_goal(conn: &Connection, goal: &Goal) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO goals (
            id,
            vision_id,
            parent_goal_id,
            tier,
            title,
            status,
            is_focus,
            created_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            status = excluded.status,
            is_focus = excluded.is_focus,
            deleted_at = excluded.deleted_at,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            goal.id.to_string(),
            goal.vision_id.to_string(),
            goal.parent_goal_id.map(|value| value.to_string()),
            goal.tier.as_str(),
            goal.title.as_str(),
            goal.status.as_str(),
            bool_to_int(goal.is_focus),
            goal.created_at,
            goal.deleted_at,
        ],
    )?;
    Ok(())
}
