//! Soft delete, undo and restore.
//!
//! # Responsibility
//! - Tombstone visions, goals, tasks and single occurrences.
//! - Keep a short-lived undo snapshot per delete.
//! - Restore items from the recently-deleted list.
//!
//! # Invariants
//! - A delete and all rows it cascades to share one `deleted_at` value.
//! - Undo writes back exactly the rows the delete touched and removes the
//!   rows it created; nothing else changes.
//! - Restore never resurrects descendants of a goal or vision.
//! - Restoring a recurring series also restores overrides deleted in the
//!   same operation, since they carry the same `deleted_at`.

use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::model::goal::{Goal, GoalId};
use crate::model::item::{ItemRef, ItemType};
use crate::model::task::{Task, TaskId, TaskKind};
use crate::model::validation::ValidationError;
use crate::model::vision::{Vision, VisionId};
use crate::repo::change_set_repo::{ChangeSet, ChangeSetRepository};
use crate::repo::hierarchy_repo::{GoalListQuery, HierarchyRepository};
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::Visibility;
use crate::scope::{self, EditScope};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::undo::{UndoEntry, UndoLedger, UndoToken};
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// What a soft delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Vision(VisionId),
    Goal(GoalId),
    /// Whole task; a recurring series is deleted with all its occurrences.
    Task(TaskId),
    /// One occurrence of a series, or it and every later one.
    Occurrence {
        series_id: TaskId,
        date: NaiveDate,
        scope: EditScope,
    },
}

/// Result of a soft delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReceipt {
    /// Row tombstoned on behalf of the target. For occurrence deletes this
    /// is the override or tail series that hides the dates.
    pub deleted: ItemRef,
    pub undo_token: UndoToken,
    /// Epoch ms after which `undo_token` is rejected.
    pub expires_at_ms: i64,
}

/// Row brought back by `restore`, as it reads after the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "item", rename_all = "snake_case")]
pub enum RestoredEntity {
    Vision(Vision),
    Goal(Goal),
    Task(Task),
}

/// Entry of the recently-deleted view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedItem {
    pub item: ItemRef,
    pub title: String,
    pub deleted_at: i64,
    pub task_kind: Option<TaskKind>,
}

impl DeletedItem {
    pub fn item_type(&self) -> ItemType {
        self.item.item_type()
    }
}

/// Soft-delete/restore manager.
pub struct LifecycleService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    ledger: UndoLedger,
}

impl<R> LifecycleService<R>
where
    R: HierarchyRepository + TaskRepository + ChangeSetRepository,
{
    pub fn new(repo: R, clock: Arc<dyn Clock>, config: LifecycleConfig) -> Self {
        Self {
            repo,
            clock,
            ledger: UndoLedger::new(config.undo_window),
        }
    }

    /// Tombstones `target` and issues an undo token.
    ///
    /// # Errors
    /// - `NotFound` when the target is missing or already deleted.
    /// - `Validation` when an occurrence target is not a valid date of the
    ///   series or already has an override.
    /// - `Conflict` when a task changed while the delete was planned.
    pub fn soft_delete(&self, target: DeleteTarget) -> ServiceResult<DeleteReceipt> {
        let now_ms = self.clock.now_ms();
        let (deleted, changes) = match target {
            DeleteTarget::Vision(id) => self.plan_vision_delete(id, now_ms)?,
            DeleteTarget::Goal(id) => self.plan_goal_delete(id, now_ms)?,
            DeleteTarget::Task(id) => self.plan_task_delete(id, now_ms)?,
            DeleteTarget::Occurrence {
                series_id,
                date,
                scope,
            } => self.plan_occurrence_delete(series_id, date, scope, now_ms)?,
        };

        let mut entry = self.snapshot(&changes)?;
        entry.item = Some(deleted);
        entry.issued_at_ms = now_ms;

        self.repo.apply_change_set(&changes)?;
        let undo_token = self.ledger.issue(entry);

        info!(
            "event=soft_delete module=lifecycle status=ok item_type={} rows={}",
            deleted.item_type().as_str(),
            changes.visions.len() + changes.goals.len() + changes.tasks.len()
        );
        Ok(DeleteReceipt {
            deleted,
            undo_token,
            expires_at_ms: self.ledger.expires_at(now_ms),
        })
    }

    /// Reverts the delete behind `token`.
    ///
    /// # Errors
    /// - `ExpiredToken` when the token is unknown, used, or past its window.
    /// - `Conflict` when a touched task changed after the delete; the token
    ///   stays usable.
    pub fn undo(&self, token: UndoToken) -> ServiceResult<()> {
        let now_ms = self.clock.now_ms();
        let Some(entry) = self.ledger.claim(token, now_ms) else {
            warn!("event=undo module=lifecycle status=error reason=expired_token");
            return Err(ServiceError::ExpiredToken(token));
        };

        match self.repo.apply_change_set(&entry.inverse()) {
            Ok(()) => {
                info!(
                    "event=undo module=lifecycle status=ok item_type={} elapsed_ms={}",
                    entry
                        .item
                        .map(|item| item.item_type().as_str())
                        .unwrap_or("unknown"),
                    now_ms - entry.issued_at_ms
                );
                Ok(())
            }
            Err(err) => {
                self.ledger.reinstate(token, entry);
                warn!("event=undo module=lifecycle status=error error={err}");
                Err(err.into())
            }
        }
    }

    /// Clears the tombstone of one item.
    ///
    /// Returns the restored rows; empty when `item` was already active.
    ///
    /// # Errors
    /// - `NotFound` when the item no longer exists.
    /// - `Validation(RestoreParentFirst)` when its parent is still deleted.
    pub fn restore(&self, item: ItemRef) -> ServiceResult<Vec<RestoredEntity>> {
        let restored = match item {
            ItemRef::Vision(id) => self.restore_vision(id)?,
            ItemRef::Goal(id) => self.restore_goal(id)?,
            ItemRef::Task(id) => self.restore_task(id)?,
        };
        info!(
            "event=restore module=lifecycle status=ok item_type={} rows={}",
            item.item_type().as_str(),
            restored.len()
        );
        Ok(restored)
    }

    /// Deleted visions, goals and tasks, newest deletion first.
    pub fn list_recently_deleted(&self) -> ServiceResult<Vec<DeletedItem>> {
        let mut items = Vec::new();
        for vision in self.repo.list_visions(Visibility::Deleted)? {
            items.push(DeletedItem {
                item: ItemRef::Vision(vision.id),
                title: vision.title,
                deleted_at: vision.deleted_at.unwrap_or_default(),
                task_kind: None,
            });
        }
        let goals = self.repo.list_goals(&GoalListQuery {
            visibility: Visibility::Deleted,
            ..GoalListQuery::default()
        })?;
        for goal in goals {
            items.push(DeletedItem {
                item: ItemRef::Goal(goal.id),
                title: goal.title,
                deleted_at: goal.deleted_at.unwrap_or_default(),
                task_kind: None,
            });
        }
        let tasks = self.repo.list_tasks(&TaskListQuery {
            visibility: Visibility::Deleted,
            ..TaskListQuery::default()
        })?;
        for task in tasks {
            items.push(DeletedItem {
                item: ItemRef::Task(task.id),
                title: task.title,
                deleted_at: task.deleted_at.unwrap_or_default(),
                task_kind: Some(task.kind),
            });
        }

        items.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then_with(|| a.item.id().cmp(&b.item.id()))
        });
        Ok(items)
    }

    pub fn undo_window(&self) -> std::time::Duration {
        self.ledger.window()
    }

    fn plan_vision_delete(&self, id: VisionId, now_ms: i64) -> ServiceResult<(ItemRef, ChangeSet)> {
        let item = ItemRef::Vision(id);
        let vision = self
            .repo
            .get_vision(id, false)?
            .ok_or(ServiceError::NotFound(item))?;
        let goals = self.repo.list_goals(&GoalListQuery {
            vision_id: Some(id),
            ..GoalListQuery::default()
        })?;

        let mut changes = ChangeSet::default();
        changes.visions.push(Vision {
            deleted_at: Some(now_ms),
            ..vision
        });
        self.cascade_goals(&mut changes, goals, now_ms)?;
        Ok((item, changes))
    }

    fn plan_goal_delete(&self, id: GoalId, now_ms: i64) -> ServiceResult<(ItemRef, ChangeSet)> {
        let item = ItemRef::Goal(id);
        let goal = self
            .repo
            .get_goal(id, false)?
            .ok_or(ServiceError::NotFound(item))?;
        let mut goals = vec![goal];
        goals.extend(self.repo.list_goal_descendants(id)?);

        let mut changes = ChangeSet::default();
        self.cascade_goals(&mut changes, goals, now_ms)?;
        Ok((item, changes))
    }

    /// Tombstones `goals` and every active task under them.
    fn cascade_goals(
        &self,
        changes: &mut ChangeSet,
        goals: Vec<Goal>,
        now_ms: i64,
    ) -> ServiceResult<()> {
        let goal_ids: Vec<GoalId> = goals.iter().map(|goal| goal.id).collect();
        for goal in goals {
            changes.goals.push(Goal {
                deleted_at: Some(now_ms),
                ..goal
            });
        }

        let tasks = self.repo.list_tasks(&TaskListQuery {
            goal_ids: Some(goal_ids),
            ..TaskListQuery::default()
        })?;
        let mut seen: HashSet<TaskId> = HashSet::new();
        let mut doomed = Vec::new();
        for task in tasks {
            let overrides = if task.is_recurring() {
                self.repo.list_overrides(task.id)?
            } else {
                Vec::new()
            };
            if seen.insert(task.id) {
                doomed.push(task);
            }
            for detached in overrides.into_iter().filter(Task::is_active) {
                if seen.insert(detached.id) {
                    doomed.push(detached);
                }
            }
        }

        for task in doomed {
            changes.guard(&task);
            changes.tasks.push(Task {
                deleted_at: Some(now_ms),
                ..task
            });
        }
        Ok(())
    }

    fn plan_task_delete(&self, id: TaskId, now_ms: i64) -> ServiceResult<(ItemRef, ChangeSet)> {
        let item = ItemRef::Task(id);
        let task = self
            .repo
            .get_task(id, false)?
            .ok_or(ServiceError::NotFound(item))?;

        if task.is_recurring() {
            let overrides = self.repo.list_overrides(id)?;
            let plan = scope::plan_series_delete(&task, &overrides, now_ms);
            return Ok((item, plan.change_set));
        }

        let mut changes = ChangeSet::default();
        changes.guard(&task);
        changes.tasks.push(Task {
            deleted_at: Some(now_ms),
            ..task
        });
        Ok((item, changes))
    }

    fn plan_occurrence_delete(
        &self,
        series_id: TaskId,
        date: NaiveDate,
        edit_scope: EditScope,
        now_ms: i64,
    ) -> ServiceResult<(ItemRef, ChangeSet)> {
        let series = self
            .repo
            .get_task(series_id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Task(series_id)))?;
        let overrides = self.repo.list_overrides(series_id)?;
        let plan = scope::plan_delete(
            &series,
            &overrides,
            date,
            edit_scope,
            &mut Uuid::new_v4,
            now_ms,
        )?;
        let deleted = ItemRef::Task(plan.primary.unwrap_or(series_id));
        Ok((deleted, plan.change_set))
    }

    /// Reads the current state of every row `changes` writes.
    fn snapshot(&self, changes: &ChangeSet) -> ServiceResult<UndoEntry> {
        let mut entry = UndoEntry::default();
        for vision in &changes.visions {
            if let Some(prior) = self.repo.get_vision(vision.id, true)? {
                entry.prior_visions.push(prior);
            }
        }
        for goal in &changes.goals {
            if let Some(prior) = self.repo.get_goal(goal.id, true)? {
                entry.prior_goals.push(prior);
            }
        }
        for task in &changes.tasks {
            match self.repo.get_task(task.id, true)? {
                Some(prior) => entry.prior_tasks.push(prior),
                None => entry.created_tasks.push(task.clone()),
            }
        }
        for task_id in &changes.removed_tasks {
            if let Some(prior) = self.repo.get_task(*task_id, true)? {
                entry.removed_tasks.push(prior);
            }
        }
        Ok(entry)
    }

    fn restore_vision(&self, id: VisionId) -> ServiceResult<Vec<RestoredEntity>> {
        let vision = self
            .repo
            .get_vision(id, true)?
            .ok_or(ServiceError::NotFound(ItemRef::Vision(id)))?;
        if vision.is_active() {
            return Ok(Vec::new());
        }

        let restored = Vision {
            deleted_at: None,
            ..vision
        };
        let changes = ChangeSet {
            visions: vec![restored.clone()],
            ..ChangeSet::default()
        };
        self.repo.apply_change_set(&changes)?;
        Ok(vec![RestoredEntity::Vision(restored)])
    }

    fn restore_goal(&self, id: GoalId) -> ServiceResult<Vec<RestoredEntity>> {
        let item = ItemRef::Goal(id);
        let goal = self
            .repo
            .get_goal(id, true)?
            .ok_or(ServiceError::NotFound(item))?;
        if goal.is_active() {
            return Ok(Vec::new());
        }

        if self.repo.get_vision(goal.vision_id, false)?.is_none() {
            return Err(restore_parent_first(item, ItemRef::Vision(goal.vision_id)));
        }
        if let Some(parent_id) = goal.parent_goal_id {
            if self.repo.get_goal(parent_id, false)?.is_none() {
                return Err(restore_parent_first(item, ItemRef::Goal(parent_id)));
            }
        }

        let restored = Goal {
            deleted_at: None,
            ..goal
        };
        let changes = ChangeSet {
            goals: vec![restored.clone()],
            ..ChangeSet::default()
        };
        self.repo.apply_change_set(&changes)?;
        Ok(vec![RestoredEntity::Goal(restored)])
    }

    fn restore_task(&self, id: TaskId) -> ServiceResult<Vec<RestoredEntity>> {
        let item = ItemRef::Task(id);
        let task = self
            .repo
            .get_task(id, true)?
            .ok_or(ServiceError::NotFound(item))?;
        let Some(deleted_at) = task.deleted_at else {
            return Ok(Vec::new());
        };

        if let Some(goal_id) = task.goal_id {
            if self.repo.get_goal(goal_id, false)?.is_none() {
                return Err(restore_parent_first(item, ItemRef::Goal(goal_id)));
            }
        }

        let mut rows = vec![task.clone()];
        match task.kind {
            TaskKind::Recurring => {
                rows.extend(
                    self.repo
                        .list_overrides(id)?
                        .into_iter()
                        .filter(|detached| detached.deleted_at == Some(deleted_at)),
                );
            }
            TaskKind::Detached => {
                if let Some(series_id) = task.parent_task_id {
                    if self.repo.get_task(series_id, false)?.is_none() {
                        return Err(restore_parent_first(item, ItemRef::Task(series_id)));
                    }
                }
            }
            TaskKind::OneTime => {}
        }

        let mut changes = ChangeSet::default();
        let mut restored = Vec::with_capacity(rows.len());
        for row in rows {
            changes.guard(&row);
            let row = Task {
                deleted_at: None,
                ..row
            };
            changes.tasks.push(row.clone());
            restored.push(RestoredEntity::Task(Task {
                version: row.version + 1,
                ..row
            }));
        }
        self.repo.apply_change_set(&changes)?;
        Ok(restored)
    }
}

fn restore_parent_first(item: ItemRef, parent: ItemRef) -> ServiceError {
    ServiceError::Validation(ValidationError::RestoreParentFirst { item, parent })
}
