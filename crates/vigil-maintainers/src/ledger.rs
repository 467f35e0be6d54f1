use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::SignalStep;

/// Trims and lower-cases an account handle; blank handles yield `None`.
pub fn normalize_handle(handle: &str) -> Option<String> {
    let trimmed = handle.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// First signal that confirmed an account.
pub struct ActivityEvidence {
    pub step: SignalStep,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    NewlyActive,
    AlreadyActive,
    /// Blank handle or not a privileged account.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Privileged accounts and which of them have been confirmed active.
///
/// `active` always has exactly the keys of `elevated`, and values only ever
/// move from `false` to `true`.
pub struct ActivityLedger {
    elevated: BTreeSet<String>,
    active: BTreeMap<String, bool>,
    evidence: BTreeMap<String, ActivityEvidence>,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the privileged set and marks every account inactive.
    pub fn initialize<I, S>(&mut self, elevated: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.elevated = elevated
            .into_iter()
            .filter_map(|handle| normalize_handle(handle.as_ref()))
            .collect();
        self.active = self
            .elevated
            .iter()
            .map(|handle| (handle.clone(), false))
            .collect();
        self.evidence.clear();
    }

    pub fn mark_active(&mut self, handle: &str, evidence: ActivityEvidence) -> MarkOutcome {
        let Some(handle) = normalize_handle(handle) else {
            return MarkOutcome::Ignored;
        };
        match self.active.get_mut(&handle) {
            None => MarkOutcome::Ignored,
            Some(true) => MarkOutcome::AlreadyActive,
            Some(active) => {
                *active = true;
                self.evidence.insert(handle, evidence);
                MarkOutcome::NewlyActive
            }
        }
    }

    /// True when every privileged account is confirmed; vacuously true when
    /// there are none.
    pub fn all_active(&self) -> bool {
        self.active.values().all(|active| *active)
    }

    pub fn is_elevated(&self, handle: &str) -> bool {
        normalize_handle(handle).is_some_and(|handle| self.elevated.contains(&handle))
    }

    pub fn is_active(&self, handle: &str) -> bool {
        normalize_handle(handle)
            .and_then(|handle| self.active.get(&handle).copied())
            .unwrap_or(false)
    }

    pub fn elevated(&self) -> &BTreeSet<String> {
        &self.elevated
    }

    pub fn is_empty(&self) -> bool {
        self.elevated.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.values().filter(|active| **active).count()
    }

    /// Privileged accounts not yet confirmed, in sorted order.
    pub fn pending(&self) -> Vec<String> {
        self.active
            .iter()
            .filter(|(_, active)| !**active)
            .map(|(handle, _)| handle.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.active.clone()
    }

    pub fn evidence(&self) -> &BTreeMap<String, ActivityEvidence> {
        &self.evidence
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{normalize_handle, ActivityEvidence, ActivityLedger, MarkOutcome};
    use crate::SignalStep;

    fn evidence(step: SignalStep) -> ActivityEvidence {
        ActivityEvidence {
            step,
            occurred_at: Utc
                .with_ymd_and_hms(2026, 5, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn ledger(handles: &[&str]) -> ActivityLedger {
        let mut ledger = ActivityLedger::new();
        ledger.initialize(handles.iter().copied());
        ledger
    }

    #[test]
    fn unit_normalize_handle_trims_and_lowercases() {
        assert_eq!(normalize_handle("  Alice "), Some("alice".to_string()));
        assert_eq!(normalize_handle("\t"), None);
        assert_eq!(normalize_handle(""), None);
    }

    #[test]
    fn unit_initialize_seeds_every_account_inactive_and_dedupes() {
        let ledger = ledger(&["Alice", "alice ", "bob", "  "]);
        assert_eq!(ledger.elevated().len(), 2);
        assert_eq!(ledger.active_count(), 0);
        assert_eq!(ledger.pending(), vec!["alice".to_string(), "bob".to_string()]);
        assert!(!ledger.all_active());
    }

    #[test]
    fn unit_empty_ledger_is_trivially_all_active() {
        let ledger = ledger(&[]);
        assert!(ledger.is_empty());
        assert!(ledger.all_active());
        assert!(ledger.snapshot().is_empty());
    }

    #[test]
    fn functional_mark_active_is_case_insensitive_and_idempotent() {
        let mut ledger = ledger(&["alice", "bob"]);
        assert_eq!(
            ledger.mark_active("Alice ", evidence(SignalStep::ReleaseAuthors)),
            MarkOutcome::NewlyActive
        );
        let after_first = ledger.clone();
        assert_eq!(
            ledger.mark_active("alice", evidence(SignalStep::ProjectEvents)),
            MarkOutcome::AlreadyActive
        );
        assert_eq!(ledger, after_first);
        assert!(ledger.is_active("ALICE"));
        assert_eq!(
            ledger.evidence().get("alice").map(|evidence| evidence.step),
            Some(SignalStep::ReleaseAuthors)
        );
    }

    #[test]
    fn regression_mark_active_ignores_unknown_and_blank_handles() {
        let mut ledger = ledger(&["alice"]);
        let before = ledger.clone();
        assert_eq!(
            ledger.mark_active("mallory", evidence(SignalStep::AuditEvents)),
            MarkOutcome::Ignored
        );
        assert_eq!(
            ledger.mark_active("   ", evidence(SignalStep::AuditEvents)),
            MarkOutcome::Ignored
        );
        assert_eq!(ledger, before);
        assert!(!ledger.is_elevated("mallory"));
        assert_eq!(ledger.snapshot().len(), 1);
    }

    #[test]
    fn functional_all_active_flips_once_every_account_is_marked() {
        let mut ledger = ledger(&["alice", "bob"]);
        ledger.mark_active("bob", evidence(SignalStep::ManualJobs));
        assert!(!ledger.all_active());
        ledger.mark_active("alice", evidence(SignalStep::ManualJobs));
        assert!(ledger.all_active());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn regression_initialize_resets_previous_state() {
        let mut ledger = ledger(&["alice"]);
        ledger.mark_active("alice", evidence(SignalStep::MergeRequestMerges));
        ledger.initialize(["carol"]);
        assert_eq!(ledger.pending(), vec!["carol".to_string()]);
        assert!(ledger.evidence().is_empty());
        assert!(!ledger.is_elevated("alice"));
    }
}
