//! Vision records: the root of every goal hierarchy.

use crate::model::validation::{normalize_title, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VisionId = Uuid;

/// Long-term aspiration attached to one life pillar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vision {
    pub id: VisionId,
    /// User-chosen life domain, e.g. `Health`.
    pub pillar: String,
    pub title: String,
    pub description: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Soft delete tombstone (epoch ms).
    pub deleted_at: Option<i64>,
}

impl Vision {
    /// Creates an active vision with a generated id.
    pub fn new(
        pillar: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pillar: pillar.into(),
            title: title.into(),
            description: description.into(),
            created_at,
            deleted_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.pillar.trim().is_empty() {
            return Err(ValidationError::BlankPillar);
        }
        normalize_title(&self.title)?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
