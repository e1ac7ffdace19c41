//! Session-scoped selection and per-view filters.
//!
//! # Responsibility
//! - Own the goal selection shared by the weekly and daily views.
//! - Define per-view focus/status filters and apply them to lists.
//!
//! # Invariants
//! - A `Session` exists only between sign-in and sign-out.
//! - Every clone of a `GoalSelection` observes writes synchronously.
//! - After sign-out every handle reports no selection and ignores writes.

use crate::auth::UserIdentity;
use crate::model::goal::{Goal, GoalId, GoalStatus};
use crate::model::occurrence::Occurrence;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct SelectionState {
    goal_id: Option<GoalId>,
    closed: bool,
}

/// Shared handle to the session's selected goal.
#[derive(Debug, Clone, Default)]
pub struct GoalSelection {
    state: Arc<RwLock<SelectionState>>,
}

impl GoalSelection {
    pub fn selected_goal(&self) -> Option<GoalId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .goal_id
    }

    /// Replaces the selection; `None` clears it.
    pub fn select_goal(&self, goal_id: Option<GoalId>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return;
        }
        state.goal_id = goal_id;
    }

    /// Keeps occurrences of the selected goal; everything when unselected.
    pub fn filter_occurrences(&self, occurrences: Vec<Occurrence>) -> Vec<Occurrence> {
        match self.selected_goal() {
            Some(goal_id) => occurrences
                .into_iter()
                .filter(|occurrence| occurrence.goal_id == Some(goal_id))
                .collect(),
            None => occurrences,
        }
    }

    fn close(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.goal_id = None;
        state.closed = true;
    }
}

/// Signed-in context handed to views.
#[derive(Debug)]
pub struct Session {
    identity: UserIdentity,
    selection: GoalSelection,
}

impl Session {
    pub fn sign_in(identity: UserIdentity) -> Self {
        info!("event=session_start module=session status=ok");
        Self {
            identity,
            selection: GoalSelection::default(),
        }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn goal_selection(&self) -> GoalSelection {
        self.selection.clone()
    }

    /// Ends the session and clears the selection for every handle.
    pub fn sign_out(self) {
        self.selection.close();
        info!("event=session_end module=session status=ok");
    }
}

/// Goal status filter of a list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Active,
    Completed,
    Archived,
    All,
}

impl StatusFilter {
    pub fn matches(self, status: GoalStatus) -> bool {
        match self {
            Self::Active => status == GoalStatus::Active,
            Self::Completed => status == GoalStatus::Completed,
            Self::Archived => status == GoalStatus::Archived,
            Self::All => true,
        }
    }
}

/// Filters owned by one view; dropped with the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewFilters {
    pub show_focused_only: bool,
    pub status_filter: StatusFilter,
}

impl ViewFilters {
    pub fn matches(&self, goal: &Goal) -> bool {
        (!self.show_focused_only || goal.is_focus) && self.status_filter.matches(goal.status)
    }

    pub fn apply(&self, goals: Vec<Goal>) -> Vec<Goal> {
        goals.into_iter().filter(|goal| self.matches(goal)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, StatusFilter, ViewFilters};
    use crate::auth::UserIdentity;
    use crate::model::goal::{Goal, GoalStatus, GoalTier};
    use uuid::Uuid;

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: "user-1".to_string(),
            email: None,
        }
    }

    #[test]
    fn selection_is_shared_between_handles() {
        let session = Session::sign_in(identity());
        let weekly = session.goal_selection();
        let daily = session.goal_selection();
        let goal_id = Uuid::new_v4();

        weekly.select_goal(Some(goal_id));
        assert_eq!(daily.selected_goal(), Some(goal_id));

        daily.select_goal(None);
        assert_eq!(weekly.selected_goal(), None);
    }

    #[test]
    fn sign_out_clears_and_freezes_selection() {
        let session = Session::sign_in(identity());
        let handle = session.goal_selection();
        handle.select_goal(Some(Uuid::new_v4()));

        session.sign_out();
        assert_eq!(handle.selected_goal(), None);

        handle.select_goal(Some(Uuid::new_v4()));
        assert_eq!(handle.selected_goal(), None);
    }

    #[test]
    fn view_filters_default_to_active_unfocused() {
        let filters = ViewFilters::default();
        assert!(!filters.show_focused_only);
        assert_eq!(filters.status_filter, StatusFilter::Active);
    }

    #[test]
    fn focused_only_drops_unfocused_goals() {
        let vision_id = Uuid::new_v4();
        let mut focused = Goal::new(vision_id, GoalTier::ThreeYear, None, "Focused", 0);
        focused.is_focus = true;
        let plain = Goal::new(vision_id, GoalTier::ThreeYear, None, "Plain", 0);
        let mut done = Goal::new(vision_id, GoalTier::ThreeYear, None, "Done", 0);
        done.is_focus = true;
        done.status = GoalStatus::Completed;

        let filters = ViewFilters {
            show_focused_only: true,
            status_filter: StatusFilter::Active,
        };
        let kept = filters.apply(vec![focused.clone(), plain, done]);
        assert_eq!(kept, vec![focused]);
    }
}
