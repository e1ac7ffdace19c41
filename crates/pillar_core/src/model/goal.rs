//! Tiered goal records.
//!
//! # Invariants
//! - `three_year` goals have no parent goal; other tiers always do.
//! - A child is exactly one tier below its parent and shares its vision.
//!   The parent-row half of this check is enforced by the hierarchy service.

use crate::model::validation::{normalize_title, ValidationError};
use crate::model::vision::VisionId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GoalId = Uuid;

/// Planning horizon of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTier {
    ThreeYear,
    OneYear,
    NinetyDay,
}

impl GoalTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreeYear => "three_year",
            Self::OneYear => "one_year",
            Self::NinetyDay => "ninety_day",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "three_year" => Some(Self::ThreeYear),
            "one_year" => Some(Self::OneYear),
            "ninety_day" => Some(Self::NinetyDay),
            _ => None,
        }
    }

    /// Tier a parent goal must have, `None` for the top tier.
    pub fn parent_tier(self) -> Option<Self> {
        match self {
            Self::ThreeYear => None,
            Self::OneYear => Some(Self::ThreeYear),
            Self::NinetyDay => Some(Self::OneYear),
        }
    }

    /// Human label used by prompts and breadcrumbs.
    pub fn label(self) -> &'static str {
        match self {
            Self::ThreeYear => "3-Year Goal",
            Self::OneYear => "1-Year Goal",
            Self::NinetyDay => "90-Day Goal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalId,
    pub tier: GoalTier,
    pub title: String,
    pub parent_goal_id: Option<GoalId>,
    pub vision_id: VisionId,
    pub status: GoalStatus,
    /// Marked as a current focus; drives the focused-only toggle.
    pub is_focus: bool,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl Goal {
    /// Creates an active, unfocused goal with a generated id.
    pub fn new(
        vision_id: VisionId,
        tier: GoalTier,
        parent_goal_id: Option<GoalId>,
        title: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tier,
            title: title.into(),
            parent_goal_id,
            vision_id,
            status: GoalStatus::Active,
            is_focus: false,
            created_at,
            deleted_at: None,
        }
    }

    /// Shape checks that need no parent lookup.
    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_title(&self.title)?;
        match (self.tier.parent_tier(), self.parent_goal_id) {
            (None, Some(parent)) => Err(ValidationError::UnexpectedParentGoal(parent)),
            (Some(_), None) => Err(ValidationError::MissingParentGoal { tier: self.tier }),
            _ => Ok(()),
        }
    }

    /// Checks this goal against its loaded parent goal.
    pub fn validate_parent(&self, parent: &Goal) -> Result<(), ValidationError> {
        if self.tier.parent_tier() != Some(parent.tier) {
            return Err(ValidationError::ParentTierMismatch {
                tier: self.tier,
                parent_tier: parent.tier,
            });
        }
        if self.vision_id != parent.vision_id {
            return Err(ValidationError::VisionMismatch { goal_id: self.id });
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
