//! Tunables for core services.

use std::time::Duration;

/// Default time a soft delete stays undoable.
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_millis(5000);

/// Soft-delete/undo settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub undo_window: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            undo_window: DEFAULT_UNDO_WINDOW,
        }
    }
}
