//! Working state of one selection pass.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::case::CasePlan;
use crate::rule::RuleRef;

/// Case identities locked by forceful rules, with the rule that locked each.
#[derive(Debug, Clone, Default)]
pub struct LockSet {
    owners: HashMap<String, RuleRef>,
}

impl LockSet {
    /// Lock `case`. An already locked case keeps its first owner.
    pub fn lock(&mut self, case: &str, rule: &RuleRef) {
        self.owners
            .entry(case.to_string())
            .or_insert_with(|| rule.clone());
    }

    pub fn contains(&self, case: &str) -> bool {
        self.owners.contains_key(case)
    }

    /// The rule that placed the lock on `case`.
    pub fn owner(&self, case: &str) -> Option<&RuleRef> {
        self.owners.get(case)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Selection map plus both lock sets. Owned by a single engine invocation.
///
/// A case identity is never in both lock sets at once; the rule processor
/// rejects the rule that would cause it.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub(crate) selected: IndexMap<String, CasePlan>,
    pub(crate) force_included: LockSet,
    pub(crate) force_excluded: LockSet,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current selection in first-selected order.
    pub fn selected(&self) -> impl Iterator<Item = &CasePlan> {
        self.selected.values()
    }

    pub fn get(&self, full_name: &str) -> Option<&CasePlan> {
        self.selected.get(full_name)
    }

    pub fn is_selected(&self, full_name: &str) -> bool {
        self.selected.contains_key(full_name)
    }

    pub fn force_included(&self) -> &LockSet {
        &self.force_included
    }

    pub fn force_excluded(&self) -> &LockSet {
        &self.force_excluded
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Consume the state, yielding plans in first-selected order.
    pub fn into_plans(self) -> Vec<CasePlan> {
        self.selected.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SelectionAction;

    #[test]
    fn test_lock_keeps_first_owner() {
        let first = RuleRef::new(0, SelectionAction::ForceInclude, "{}");
        let second = RuleRef::new(3, SelectionAction::ForceInclude, "{}");

        let mut locks = LockSet::default();
        locks.lock("s.a", &first);
        locks.lock("s.a", &second);

        assert_eq!(locks.len(), 1);
        assert!(locks.contains("s.a"));
        assert_eq!(locks.owner("s.a").map(|r| r.index), Some(0));
        assert!(locks.owner("s.b").is_none());
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = SelectionState::new();
        assert!(state.is_empty());
        assert!(state.force_included().is_empty());
        assert!(state.force_excluded().is_empty());
        assert!(state.into_plans().is_empty());
    }
}
