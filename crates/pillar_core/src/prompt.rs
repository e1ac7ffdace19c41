//! Copy for the delete, restore, edit-scope and undo prompts.
//!
//! # Responsibility
//! - Derive every prompt string from the item category, so each category
//!   is covered by an exhaustive match.
//!
//! # Invariants
//! - Deleting asks for a scope only on recurring tasks; a detached task is
//!   a single row.
//! - Restoring asks for a scope on recurring and detached tasks.

use crate::model::item::ItemType;
use crate::model::task::TaskKind;
use crate::scope::EditScope;
use serde::Serialize;
use std::time::Duration;

/// Item category a prompt talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum DialogSubject {
    Vision,
    Goal,
    Task(TaskKind),
}

impl DialogSubject {
    /// Combines an item type with the task kind carried by tasks only.
    pub fn from_parts(item_type: ItemType, task_kind: Option<TaskKind>) -> Option<Self> {
        match (item_type, task_kind) {
            (ItemType::Vision, None) => Some(Self::Vision),
            (ItemType::Goal, None) => Some(Self::Goal),
            (ItemType::Task, Some(kind)) => Some(Self::Task(kind)),
            (ItemType::Vision | ItemType::Goal, Some(_)) | (ItemType::Task, None) => None,
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Goal => "goal",
            Self::Task(TaskKind::Recurring) => "recurring task",
            Self::Task(TaskKind::OneTime) => "task",
            Self::Task(TaskKind::Detached) => "task occurrence",
        }
    }

    pub fn delete_needs_scope(self) -> bool {
        match self {
            Self::Task(TaskKind::Recurring) => true,
            Self::Task(TaskKind::OneTime | TaskKind::Detached) | Self::Vision | Self::Goal => {
                false
            }
        }
    }

    pub fn restore_needs_scope(self) -> bool {
        match self {
            Self::Task(TaskKind::Recurring | TaskKind::Detached) => true,
            Self::Task(TaskKind::OneTime) | Self::Vision | Self::Goal => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogCopy {
    pub title: String,
    pub description: String,
    pub confirm_label: &'static str,
    pub needs_scope_choice: bool,
}

pub fn delete_copy(subject: DialogSubject, item_title: &str) -> DialogCopy {
    let description = match subject {
        DialogSubject::Vision => format!(
            "\"{item_title}\" and all of its goals and tasks will move to Recently Deleted."
        ),
        DialogSubject::Goal => format!(
            "\"{item_title}\" and everything beneath it will move to Recently Deleted."
        ),
        DialogSubject::Task(TaskKind::Recurring) => format!(
            "Choose whether to delete only this occurrence of \"{item_title}\" or this and all future ones."
        ),
        DialogSubject::Task(TaskKind::Detached) => format!(
            "This occurrence of \"{item_title}\" was edited separately from its series."
        ),
        DialogSubject::Task(TaskKind::OneTime) => {
            format!("\"{item_title}\" will move to Recently Deleted.")
        }
    };
    DialogCopy {
        title: format!("Delete {}?", subject.noun()),
        description,
        confirm_label: "Delete",
        needs_scope_choice: subject.delete_needs_scope(),
    }
}

pub fn restore_copy(subject: DialogSubject, item_title: &str) -> DialogCopy {
    let description = match subject {
        DialogSubject::Vision => format!(
            "\"{item_title}\" will be restored. Its deleted goals stay in Recently Deleted."
        ),
        DialogSubject::Goal => format!(
            "\"{item_title}\" will be restored. Its deleted sub-goals and tasks stay in Recently Deleted."
        ),
        DialogSubject::Task(TaskKind::Recurring) => format!(
            "\"{item_title}\" and its future schedule will be restored."
        ),
        DialogSubject::Task(TaskKind::Detached) => format!(
            "Only this occurrence of \"{item_title}\" will be restored."
        ),
        DialogSubject::Task(TaskKind::OneTime) => format!("\"{item_title}\" will be restored."),
    };
    DialogCopy {
        title: format!("Restore {}?", subject.noun()),
        description,
        confirm_label: "Restore",
        needs_scope_choice: subject.restore_needs_scope(),
    }
}

/// Action a scope prompt is shown for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeAction {
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeOption {
    pub scope: EditScope,
    pub label: &'static str,
    pub description: &'static str,
}

/// Choices of the this/future prompt.
pub fn scope_options(action: ScopeAction) -> [ScopeOption; 2] {
    match action {
        ScopeAction::Edit => [
            ScopeOption {
                scope: EditScope::This,
                label: "This occurrence",
                description: "Only this date changes; the series stays as it is.",
            },
            ScopeOption {
                scope: EditScope::Future,
                label: "This and future occurrences",
                description: "Earlier dates keep their current details.",
            },
        ],
        ScopeAction::Delete => [
            ScopeOption {
                scope: EditScope::This,
                label: "This occurrence",
                description: "Only this date is removed from the schedule.",
            },
            ScopeOption {
                scope: EditScope::Future,
                label: "This and future occurrences",
                description: "The series ends before this date.",
            },
        ],
    }
}

/// Copy of the this/future prompt itself; pair with [`scope_options`].
pub fn edit_scope_copy(action: ScopeAction, item_title: &str) -> DialogCopy {
    let (title, confirm_label) = match action {
        ScopeAction::Edit => ("Edit recurring task", "Save"),
        ScopeAction::Delete => ("Delete recurring task", "Delete"),
    };
    DialogCopy {
        title: title.to_string(),
        description: format!("\"{item_title}\" repeats. Which occurrences should change?"),
        confirm_label,
        needs_scope_choice: true,
    }
}

/// Toast shown after a soft delete while undo is possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoToast {
    pub message: String,
    pub action_label: &'static str,
    pub duration_ms: u64,
}

pub fn undo_toast(subject: DialogSubject, window: Duration) -> UndoToast {
    let noun = subject.noun();
    let mut chars = noun.chars();
    let capitalized = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect::<String>())
        .unwrap_or_default();
    UndoToast {
        message: format!("{capitalized} deleted"),
        action_label: "Undo",
        duration_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        delete_copy, edit_scope_copy, restore_copy, scope_options, undo_toast, DialogSubject,
        ScopeAction,
    };
    use crate::model::item::ItemType;
    use crate::model::task::TaskKind;
    use crate::scope::EditScope;
    use std::time::Duration;

    #[test]
    fn from_parts_rejects_mismatched_pairs() {
        assert_eq!(
            DialogSubject::from_parts(ItemType::Task, Some(TaskKind::Detached)),
            Some(DialogSubject::Task(TaskKind::Detached))
        );
        assert_eq!(DialogSubject::from_parts(ItemType::Task, None), None);
        assert_eq!(
            DialogSubject::from_parts(ItemType::Goal, Some(TaskKind::OneTime)),
            None
        );
    }

    #[test]
    fn scope_choice_only_for_series_related_tasks() {
        assert!(restore_copy(DialogSubject::Task(TaskKind::Recurring), "Run").needs_scope_choice);
        assert!(restore_copy(DialogSubject::Task(TaskKind::Detached), "Run").needs_scope_choice);
        assert!(!restore_copy(DialogSubject::Task(TaskKind::OneTime), "Run").needs_scope_choice);
        assert!(!delete_copy(DialogSubject::Goal, "Run").needs_scope_choice);
    }

    #[test]
    fn deleting_detached_occurrence_skips_scope_choice() {
        assert!(delete_copy(DialogSubject::Task(TaskKind::Recurring), "Run").needs_scope_choice);
        let copy = delete_copy(DialogSubject::Task(TaskKind::Detached), "Hill repeats");
        assert!(!copy.needs_scope_choice);
        assert_eq!(copy.title, "Delete task occurrence?");
        assert!(!delete_copy(DialogSubject::Task(TaskKind::OneTime), "Run").needs_scope_choice);
    }

    #[test]
    fn edit_scope_copy_labels_follow_action() {
        let edit = edit_scope_copy(ScopeAction::Edit, "Tempo run");
        assert_eq!(edit.title, "Edit recurring task");
        assert_eq!(edit.confirm_label, "Save");
        assert_eq!(
            edit.description,
            "\"Tempo run\" repeats. Which occurrences should change?"
        );
        assert!(edit.needs_scope_choice);

        let delete = edit_scope_copy(ScopeAction::Delete, "Tempo run");
        assert_eq!(delete.title, "Delete recurring task");
        assert_eq!(delete.confirm_label, "Delete");
        assert!(delete.needs_scope_choice);
    }

    #[test]
    fn goal_restore_copy_warns_about_children() {
        let copy = restore_copy(DialogSubject::Goal, "Run a marathon");
        assert_eq!(copy.title, "Restore goal?");
        assert!(copy.description.contains("stay in Recently Deleted"));
    }

    #[test]
    fn scope_options_list_this_then_future() {
        let options = scope_options(ScopeAction::Delete);
        assert_eq!(options[0].scope, EditScope::This);
        assert_eq!(options[1].scope, EditScope::Future);
    }

    #[test]
    fn undo_toast_uses_window() {
        let toast = undo_toast(DialogSubject::Vision, Duration::from_millis(5000));
        assert_eq!(toast.message, "Vision deleted");
        assert_eq!(toast.duration_ms, 5000);
    }
}
