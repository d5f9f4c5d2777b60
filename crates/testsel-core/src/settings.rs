//! Settings merge: writes a rule's overrides onto a case plan.

use serde::{Deserialize, Serialize};

use crate::case::{CasePlan, CaseSettings};
use crate::rule::{SelectionAction, SettingsOverride};

/// How present-but-falsy override values are treated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    /// `0`, `""` and `false` count as not set and leave the plan untouched.
    #[default]
    SkipFalsy,

    /// Every present value is written. An empty environment unpins the case.
    Explicit,
}

trait Falsy {
    fn is_falsy(&self) -> bool;
}

impl Falsy for u32 {
    fn is_falsy(&self) -> bool {
        *self == 0
    }
}

impl Falsy for bool {
    fn is_falsy(&self) -> bool {
        !*self
    }
}

impl Falsy for String {
    fn is_falsy(&self) -> bool {
        self.is_empty()
    }
}

fn merge<T: Falsy + Clone>(slot: &mut T, value: Option<&T>, mode: OverrideMode) {
    if let Some(value) = value {
        if mode == OverrideMode::Explicit || !value.is_falsy() {
            *slot = value.clone();
        }
    }
}

fn merge_environment(slot: &mut Option<String>, value: Option<&String>, mode: OverrideMode) {
    match value {
        Some(env) if !env.is_falsy() => *slot = Some(env.clone()),
        Some(_) if mode == OverrideMode::Explicit => *slot = None,
        _ => {}
    }
}

/// Merge `overrides` into `plan` and stamp `action` as its last action.
///
/// Both structs are destructured exhaustively, so a settings field that is
/// not wired here fails to compile.
pub fn apply_settings(
    plan: &mut CasePlan,
    overrides: &SettingsOverride,
    action: SelectionAction,
    mode: OverrideMode,
) {
    let SettingsOverride {
        times,
        retry,
        use_new_environment,
        ignore_failure,
        environment,
    } = overrides;
    let CaseSettings {
        times: plan_times,
        retry: plan_retry,
        use_new_environment: plan_use_new_environment,
        ignore_failure: plan_ignore_failure,
        environment: plan_environment,
    } = &mut plan.settings;

    merge(plan_times, times.as_ref(), mode);
    merge(plan_retry, retry.as_ref(), mode);
    merge(plan_use_new_environment, use_new_environment.as_ref(), mode);
    merge(plan_ignore_failure, ignore_failure.as_ref(), mode);
    merge_environment(plan_environment, environment.as_ref(), mode);

    plan.action = action;
}
