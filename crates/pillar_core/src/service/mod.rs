//! Planner use-case services.
//!
//! # Responsibility
//! - Orchestrate repository reads and change-set writes into use cases.
//! - Keep callers decoupled from storage details.

pub mod error;
pub mod hierarchy_service;
pub mod lifecycle_service;
pub mod recurrence_service;
pub mod schedule_service;
pub mod undo;
