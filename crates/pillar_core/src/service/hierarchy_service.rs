//! Vision, goal and task use-cases.
//!
//! # Responsibility
//! - Create and directly edit hierarchy items.
//! - Enforce parent invariants that need a lookup.
//! - Build ancestor chains for breadcrumbs.
//!
//! # Invariants
//! - New items attach only to active parents.
//! - Recurring tasks are never edited here; they need a scoped edit.
//! - Task edits run through a guarded change set so concurrent series
//!   splits are detected.

use crate::breadcrumb::BreadcrumbItem;
use crate::clock::Clock;
use crate::model::goal::{Goal, GoalId, GoalStatus, GoalTier};
use crate::model::item::ItemRef;
use crate::model::recurrence::RecurrenceRule;
use crate::model::task::{Task, TaskId};
use crate::model::validation::{normalize_title, ValidationError};
use crate::model::vision::{Vision, VisionId};
use crate::repo::change_set_repo::{ChangeSet, ChangeSetRepository};
use crate::repo::hierarchy_repo::{GoalListQuery, HierarchyRepository};
use crate::repo::task_repo::TaskRepository;
use crate::repo::Visibility;
use crate::scope::TaskChanges;
use crate::service::error::{ServiceError, ServiceResult};
use crate::session::ViewFilters;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

/// Request model for a new goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGoal {
    pub vision_id: VisionId,
    pub tier: GoalTier,
    pub parent_goal_id: Option<GoalId>,
    pub title: String,
}

/// Request model for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub scheduled_date: NaiveDate,
    pub goal_id: Option<GoalId>,
    /// `Some` creates a recurring series starting at `scheduled_date`.
    pub recurrence: Option<RecurrenceRule>,
}

/// Partial vision edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionChanges {
    pub pillar: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Partial goal edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub status: Option<GoalStatus>,
    pub is_focus: Option<bool>,
}

/// Use-case service for the vision → goal → task hierarchy.
pub struct HierarchyService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R> HierarchyService<R>
where
    R: HierarchyRepository + TaskRepository + ChangeSetRepository,
{
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn create_vision(
        &self,
        pillar: &str,
        title: &str,
        description: &str,
    ) -> ServiceResult<Vision> {
        let vision = Vision::new(
            pillar.trim(),
            normalize_title(title)?,
            description.trim(),
            self.clock.now_ms(),
        );
        self.repo.create_vision(&vision)?;
        info!("event=vision_create module=hierarchy status=ok");
        Ok(vision)
    }

    pub fn update_vision(&self, id: VisionId, changes: &VisionChanges) -> ServiceResult<Vision> {
        let mut vision = self
            .repo
            .get_vision(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Vision(id)))?;
        if let Some(pillar) = &changes.pillar {
            vision.pillar = pillar.trim().to_string();
        }
        if let Some(title) = &changes.title {
            vision.title = normalize_title(title)?;
        }
        if let Some(description) = &changes.description {
            vision.description = description.trim().to_string();
        }
        self.repo.update_vision(&vision)?;
        Ok(vision)
    }

    pub fn list_visions(&self) -> ServiceResult<Vec<Vision>> {
        Ok(self.repo.list_visions(Visibility::Active)?)
    }

    /// Creates a goal under an active vision and, below the top tier, an
    /// active parent goal one tier up.
    pub fn create_goal(&self, request: &NewGoal) -> ServiceResult<Goal> {
        let goal = Goal::new(
            request.vision_id,
            request.tier,
            request.parent_goal_id,
            normalize_title(&request.title)?,
            self.clock.now_ms(),
        );
        goal.validate()?;

        if self.repo.get_vision(request.vision_id, false)?.is_none() {
            return Err(ValidationError::InactiveParent(ItemRef::Vision(request.vision_id)).into());
        }
        if let Some(parent_id) = request.parent_goal_id {
            let parent = self
                .repo
                .get_goal(parent_id, false)?
                .ok_or(ValidationError::InactiveParent(ItemRef::Goal(parent_id)))?;
            goal.validate_parent(&parent)?;
        }

        self.repo.create_goal(&goal)?;
        info!(
            "event=goal_create module=hierarchy status=ok tier={}",
            goal.tier.as_str()
        );
        Ok(goal)
    }

    pub fn update_goal(&self, id: GoalId, changes: &GoalChanges) -> ServiceResult<Goal> {
        let mut goal = self
            .repo
            .get_goal(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Goal(id)))?;
        if let Some(title) = &changes.title {
            goal.title = normalize_title(title)?;
        }
        if let Some(status) = changes.status {
            goal.status = status;
        }
        if let Some(is_focus) = changes.is_focus {
            goal.is_focus = is_focus;
        }
        self.repo.update_goal(&goal)?;
        Ok(goal)
    }

    pub fn get_goal(&self, id: GoalId) -> ServiceResult<Goal> {
        self.repo
            .get_goal(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Goal(id)))
    }

    /// Lists active goals of one vision (or all visions) through a view's
    /// filters.
    pub fn list_goals(
        &self,
        vision_id: Option<VisionId>,
        filters: &ViewFilters,
    ) -> ServiceResult<Vec<Goal>> {
        let goals = self.repo.list_goals(&GoalListQuery {
            vision_id,
            ..GoalListQuery::default()
        })?;
        Ok(filters.apply(goals))
    }

    pub fn create_task(&self, request: &NewTask) -> ServiceResult<Task> {
        let title = normalize_title(&request.title)?;
        let now_ms = self.clock.now_ms();
        let mut task = match &request.recurrence {
            Some(rule) => Task::recurring(title, request.scheduled_date, rule.clone(), now_ms),
            None => Task::one_time(title, request.scheduled_date, now_ms),
        };
        if let Some(goal_id) = request.goal_id {
            self.ensure_active_goal(goal_id)?;
            task = task.with_goal(goal_id);
        }

        self.repo.create_task(&task)?;
        info!(
            "event=task_create module=hierarchy status=ok kind={}",
            task.kind.as_str()
        );
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.repo
            .get_task(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::Task(id)))
    }

    /// Edits a one-time or detached task in place.
    ///
    /// # Errors
    /// - `Validation(ScopeRequired)` for recurring series.
    /// - `Validation(NotRecurring)` when `changes` touch recurrence fields.
    /// - `Conflict` when the row changed since it was read.
    pub fn update_task(&self, id: TaskId, changes: &TaskChanges) -> ServiceResult<Task> {
        let task = self.get_task(id)?;
        if task.is_recurring() {
            return Err(ValidationError::ScopeRequired(id).into());
        }
        if changes.touches_recurrence() {
            return Err(ValidationError::NotRecurring(id).into());
        }
        if let Some(Some(goal_id)) = changes.goal_id {
            self.ensure_active_goal(goal_id)?;
        }

        let mut updated = task.clone();
        changes.apply_details(&mut updated)?;

        let mut change_set = ChangeSet::default();
        change_set.guard(&task);
        change_set.tasks.push(updated.clone());
        self.repo.apply_change_set(&change_set)?;

        updated.version += 1;
        Ok(updated)
    }

    /// Builds the ancestor chain of `item`, root first, ending at the item.
    ///
    /// Tasks without a goal yield a single-entry chain.
    pub fn breadcrumb_chain(&self, item: ItemRef) -> ServiceResult<Vec<BreadcrumbItem>> {
        let mut chain = Vec::new();
        let mut next_goal = match item {
            ItemRef::Vision(id) => {
                let vision = self
                    .repo
                    .get_vision(id, false)?
                    .ok_or(ServiceError::NotFound(item))?;
                return Ok(vec![vision_crumb(&vision)]);
            }
            ItemRef::Goal(id) => Some(id),
            ItemRef::Task(id) => {
                let task = self.get_task(id)?;
                chain.push(BreadcrumbItem::new(task.title, format!("/tasks/{}", task.id)));
                task.goal_id
            }
        };

        let mut vision_id = None;
        while let Some(goal_id) = next_goal {
            let goal = self
                .repo
                .get_goal(goal_id, false)?
                .ok_or(ServiceError::NotFound(ItemRef::Goal(goal_id)))?;
            chain.push(BreadcrumbItem::new(
                goal.title.clone(),
                format!("/goals/{}", goal.id),
            ));
            vision_id = Some(goal.vision_id);
            next_goal = goal.parent_goal_id;
        }

        if let Some(vision_id) = vision_id {
            let vision = self
                .repo
                .get_vision(vision_id, false)?
                .ok_or(ServiceError::NotFound(ItemRef::Vision(vision_id)))?;
            chain.push(vision_crumb(&vision));
        }

        chain.reverse();
        Ok(chain)
    }

    fn ensure_active_goal(&self, goal_id: GoalId) -> ServiceResult<()> {
        if self.repo.get_goal(goal_id, false)?.is_none() {
            return Err(ValidationError::InactiveParent(ItemRef::Goal(goal_id)).into());
        }
        Ok(())
    }
}

fn vision_crumb(vision: &Vision) -> BreadcrumbItem {
    BreadcrumbItem::new(vision.title.clone(), format!("/visions/{}", vision.id))
}
