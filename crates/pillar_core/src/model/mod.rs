//! Planner domain model: visions, tiered goals, and scheduled tasks.
//!
//! # Responsibility
//! - Define canonical records shared by the weekly/daily/goal views.
//! - Own the shape invariants that do not need storage lookups.
//!
//! # Invariants
//! - Every item is identified by a stable UUID.
//! - Deletion is a `deleted_at` tombstone, never a hard delete.
//! - Hierarchy checks that need the parent row live in the service layer.

pub mod goal;
pub mod item;
pub mod occurrence;
pub mod recurrence;
pub mod task;
pub mod validation;
pub mod vision;
