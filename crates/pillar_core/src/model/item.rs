//! Type-tagged references to any planner item.

use crate::model::goal::GoalId;
use crate::model::task::TaskId;
use crate::model::vision::VisionId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Closed set of item categories shown by dialogs and the deleted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Vision,
    Goal,
    Task,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Goal => "goal",
            Self::Task => "task",
        }
    }
}

/// Reference to one stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Vision(VisionId),
    Goal(GoalId),
    Task(TaskId),
}

impl ItemRef {
    pub fn item_type(self) -> ItemType {
        match self {
            Self::Vision(_) => ItemType::Vision,
            Self::Goal(_) => ItemType::Goal,
            Self::Task(_) => ItemType::Task,
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Vision(id) | Self::Goal(id) | Self::Task(id) => id,
        }
    }
}

impl Display for ItemRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.item_type().as_str(), self.id())
    }
}
