//! Breadcrumb projection for an ancestor chain.
//!
//! # Invariants
//! - The last segment is `Current` and never navigable.
//! - The second-to-last segment is the `ImmediateParent`.
//! - Other segments are navigable only when they carry a route.

use serde::{Deserialize, Serialize};

/// One entry of an ancestor chain, root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    pub label: String,
    pub route: Option<String>,
}

impl BreadcrumbItem {
    pub fn new(label: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            route: Some(route.into()),
        }
    }

    pub fn unlinked(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            route: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    DistantAncestor,
    ImmediateParent,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub label: String,
    pub route: Option<String>,
    pub is_navigable: bool,
    pub emphasis: Emphasis,
}

/// Projects `chain` into display segments by position.
pub fn project(chain: &[BreadcrumbItem]) -> Vec<Segment> {
    let len = chain.len();
    chain
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let emphasis = if index + 1 == len {
                Emphasis::Current
            } else if index + 2 == len {
                Emphasis::ImmediateParent
            } else {
                Emphasis::DistantAncestor
            };
            Segment {
                label: item.label.clone(),
                route: item.route.clone(),
                is_navigable: emphasis != Emphasis::Current && item.route.is_some(),
                emphasis,
            }
        })
        .collect()
}
