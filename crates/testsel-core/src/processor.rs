//! Rule processor: applies one rule to the selection state.

use std::sync::Arc;

use tracing::debug;

use crate::case::{CaseDescriptor, CasePlan};
use crate::error::ConflictError;
use crate::registry::CaseRegistry;
use crate::rule::{ActionFamily, SelectionAction, SelectionRule};
use crate::settings::{apply_settings, OverrideMode};
use crate::state::SelectionState;

/// Delta produced by one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule_index: usize,
    pub action: SelectionAction,

    /// Candidates the criteria matched.
    pub matched: usize,

    /// Full names of the cases this rule added, kept, removed or updated.
    pub touched: Vec<String>,

    /// Matched cases skipped because an opposing lock protects them.
    pub dropped: Vec<String>,
}

/// Apply `rule` to `state`.
///
/// Conflicts are detected over all matched cases before anything in `state`
/// changes, so a failing rule leaves the state as it was.
pub fn apply_rule(
    state: &mut SelectionState,
    registry: &CaseRegistry,
    rule: &SelectionRule,
    mode: OverrideMode,
) -> Result<RuleOutcome, ConflictError> {
    let action = rule.action;
    let family = action.family();

    let candidates: Vec<Arc<CaseDescriptor>> = match family {
        ActionFamily::Include => registry.iter().cloned().collect(),
        ActionFamily::Noop | ActionFamily::Exclude => state
            .selected
            .values()
            .map(|plan| plan.descriptor.clone())
            .collect(),
    };
    let matched: Vec<Arc<CaseDescriptor>> = candidates
        .into_iter()
        .filter(|case| rule.criteria.matches(case))
        .collect();
    let matched_count = matched.len();

    let mut survivors = Vec::with_capacity(matched.len());
    let mut dropped = Vec::new();
    match family {
        ActionFamily::Noop => survivors = matched,
        ActionFamily::Include | ActionFamily::Exclude => {
            let opposing = if family == ActionFamily::Include {
                &state.force_excluded
            } else {
                &state.force_included
            };
            for case in matched {
                if let Some(owner) = opposing.owner(&case.full_name) {
                    if action.is_forceful() {
                        return Err(ConflictError {
                            case: case.full_name.clone(),
                            rule: rule.to_ref(),
                            locked_by: owner.clone(),
                        });
                    }
                    dropped.push(case.full_name.clone());
                    continue;
                }
                survivors.push(case);
            }

            if action.is_forceful() {
                let rule_ref = rule.to_ref();
                let own = if family == ActionFamily::Include {
                    &mut state.force_included
                } else {
                    &mut state.force_excluded
                };
                for case in &survivors {
                    own.lock(&case.full_name, &rule_ref);
                }
            }
        }
    }

    match family {
        ActionFamily::Include => {
            for case in &survivors {
                state
                    .selected
                    .entry(case.full_name.clone())
                    .or_insert_with(|| CasePlan::new(case.clone()));
            }
        }
        ActionFamily::Exclude => {
            for case in &survivors {
                state.selected.shift_remove(&case.full_name);
            }
        }
        ActionFamily::Noop => {}
    }

    if action.updates_settings() {
        for case in &survivors {
            if let Some(plan) = state.selected.get_mut(&case.full_name) {
                apply_settings(plan, &rule.settings, action, mode);
            }
        }
    }

    let touched: Vec<String> = survivors.iter().map(|c| c.full_name.clone()).collect();
    debug!(
        rule = rule.index,
        action = %action,
        criteria = rule.criteria.len(),
        matched = matched_count,
        touched = ?touched,
        dropped = ?dropped,
        "Applied selection rule"
    );

    Ok(RuleOutcome {
        rule_index: rule.index,
        action,
        matched: matched_count,
        touched,
        dropped,
    })
}
