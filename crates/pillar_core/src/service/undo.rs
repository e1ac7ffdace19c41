//! Time-boxed undo ledger for soft deletes.
//!
//! # Responsibility
//! - Hold the pre-delete snapshot of every row a delete touched.
//! - Hand each snapshot out at most once, and only inside its window.
//!
//! # Invariants
//! - `claim` removes the entry before the caller runs the undo, so two
//!   concurrent undos of one token cannot both succeed.
//! - A failed undo must `reinstate` its entry to keep the token usable.

use crate::model::goal::Goal;
use crate::model::item::ItemRef;
use crate::model::task::Task;
use crate::model::vision::Vision;
use crate::repo::change_set_repo::{ChangeSet, VersionGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Opaque handle returned by a soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoToken(Uuid);

impl UndoToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for UndoToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rows as they were before one delete, plus rows the delete created.
#[derive(Debug, Clone, Default)]
pub struct UndoEntry {
    pub item: Option<ItemRef>,
    pub issued_at_ms: i64,
    pub prior_visions: Vec<Vision>,
    pub prior_goals: Vec<Goal>,
    /// Existing task rows rewritten by the delete (guarded, so bumped once).
    pub prior_tasks: Vec<Task>,
    /// Task rows the delete removed outright.
    pub removed_tasks: Vec<Task>,
    /// Task rows the delete inserted, as written.
    pub created_tasks: Vec<Task>,
}

impl UndoEntry {
    /// Change set that puts every touched row back.
    pub fn inverse(&self) -> ChangeSet {
        let mut guards: Vec<VersionGuard> = self
            .prior_tasks
            .iter()
            .map(|task| VersionGuard {
                task_id: task.id,
                expected_version: task.version + 1,
            })
            .collect();
        guards.extend(self.created_tasks.iter().map(|task| VersionGuard {
            task_id: task.id,
            expected_version: task.version,
        }));

        let mut tasks = self.removed_tasks.clone();
        tasks.extend(self.prior_tasks.iter().cloned());

        ChangeSet {
            task_guards: guards,
            visions: self.prior_visions.clone(),
            goals: self.prior_goals.clone(),
            tasks,
            removed_tasks: self.created_tasks.iter().map(|task| task.id).collect(),
        }
    }
}

/// In-memory undo registry, scoped to one service instance.
#[derive(Debug)]
pub struct UndoLedger {
    window: Duration,
    entries: Mutex<HashMap<UndoToken, UndoEntry>>,
}

impl UndoLedger {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn expires_at(&self, issued_at_ms: i64) -> i64 {
        issued_at_ms.saturating_add(window_ms(self.window))
    }

    /// Stores `entry` and returns its token. Expired entries are pruned.
    pub fn issue(&self, entry: UndoEntry) -> UndoToken {
        let token = UndoToken::generate();
        let window = window_ms(self.window);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now_ms = entry.issued_at_ms;
        entries.retain(|_, existing| now_ms - existing.issued_at_ms < window);
        entries.insert(token, entry);
        token
    }

    /// Removes and returns the entry if its window is still open.
    pub fn claim(&self, token: UndoToken, now_ms: i64) -> Option<UndoEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.remove(&token)?;
        if now_ms - entry.issued_at_ms < window_ms(self.window) {
            Some(entry)
        } else {
            None
        }
    }

    /// Puts back an entry whose undo failed.
    pub fn reinstate(&self, token: UndoToken, entry: UndoEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(token, entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn window_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{UndoEntry, UndoLedger};
    use crate::model::task::Task;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn entry_at(issued_at_ms: i64) -> UndoEntry {
        UndoEntry {
            issued_at_ms,
            ..UndoEntry::default()
        }
    }

    #[test]
    fn claim_is_single_use() {
        let ledger = UndoLedger::new(Duration::from_millis(5000));
        let token = ledger.issue(entry_at(1_000));

        assert!(ledger.claim(token, 2_000).is_some());
        assert!(ledger.claim(token, 2_000).is_none());
    }

    #[test]
    fn claim_fails_after_window() {
        let ledger = UndoLedger::new(Duration::from_millis(5000));
        let token = ledger.issue(entry_at(1_000));

        assert!(ledger.claim(token, 6_001).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn reinstated_entry_can_be_claimed_again() {
        let ledger = UndoLedger::new(Duration::from_millis(5000));
        let token = ledger.issue(entry_at(0));
        let entry = ledger.claim(token, 10).unwrap();
        ledger.reinstate(token, entry);

        assert!(ledger.claim(token, 20).is_some());
    }

    #[test]
    fn issue_prunes_expired_entries() {
        let ledger = UndoLedger::new(Duration::from_millis(100));
        ledger.issue(entry_at(0));
        ledger.issue(entry_at(500));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn inverse_guards_bumped_rows_and_removes_created_rows() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let prior = Task::one_time("Stretch", date, 0);
        let created = Task::one_time("Tombstone", date, 0);
        let entry = UndoEntry {
            prior_tasks: vec![prior.clone()],
            created_tasks: vec![created.clone()],
            ..UndoEntry::default()
        };

        let inverse = entry.inverse();
        assert_eq!(inverse.task_guards[0].expected_version, prior.version + 1);
        assert_eq!(inverse.task_guards[1].expected_version, created.version);
        assert_eq!(inverse.tasks, vec![prior]);
        assert_eq!(inverse.removed_tasks, vec![created.id]);
    }
}
