//! Selection engine: runs the ordered rule list over a case registry.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::case::CasePlan;
use crate::error::Result;
use crate::processor::apply_rule;
use crate::registry::CaseRegistry;
use crate::rule::{RawRule, SelectionRule};
use crate::settings::OverrideMode;
use crate::state::SelectionState;

/// Ordered outcome of a selection pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct SelectionPlan {
    cases: Vec<CasePlan>,
}

impl SelectionPlan {
    pub fn new(cases: Vec<CasePlan>) -> Self {
        Self { cases }
    }

    /// Plans in first-selected order.
    pub fn cases(&self) -> &[CasePlan] {
        &self.cases
    }

    pub fn into_cases(self) -> Vec<CasePlan> {
        self.cases
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CasePlan> {
        self.cases.iter()
    }

    pub fn get(&self, full_name: &str) -> Option<&CasePlan> {
        self.cases.iter().find(|p| p.full_name() == full_name)
    }

    /// Full names in plan order.
    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(CasePlan::full_name).collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// SHA-256 over the ordered case names and their effective settings.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for plan in &self.cases {
            let s = &plan.settings;
            hasher.update(plan.full_name().as_bytes());
            hasher.update(b"\0");
            hasher.update(
                format!(
                    "{}|{}|{}|{}|{}|{}",
                    s.times,
                    s.retry,
                    s.use_new_environment,
                    s.ignore_failure,
                    s.environment.as_deref().unwrap_or(""),
                    plan.action,
                )
                .as_bytes(),
            );
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}

impl IntoIterator for SelectionPlan {
    type Item = CasePlan;
    type IntoIter = std::vec::IntoIter<CasePlan>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.into_iter()
    }
}

impl<'a> IntoIterator for &'a SelectionPlan {
    type Item = &'a CasePlan;
    type IntoIter = std::slice::Iter<'a, CasePlan>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

/// Selection engine bound to one registry.
///
/// Each call to [`select`](Self::select) works on fresh state, so repeated
/// calls are independent.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine<'a> {
    registry: &'a CaseRegistry,
    mode: OverrideMode,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(registry: &'a CaseRegistry) -> Self {
        Self {
            registry,
            mode: OverrideMode::default(),
        }
    }

    pub fn with_override_mode(mut self, mode: OverrideMode) -> Self {
        self.mode = mode;
        self
    }

    /// Select every registered case with default settings.
    pub fn select_all(&self) -> SelectionPlan {
        SelectionPlan::new(
            self.registry
                .iter()
                .map(|case| CasePlan::new(case.clone()))
                .collect(),
        )
    }

    /// Apply `rules` in order and return the resulting plan.
    ///
    /// No rules selects everything. Otherwise selection starts empty and
    /// disabled rules are skipped without being compiled.
    pub fn select(&self, rules: &[Value]) -> Result<SelectionPlan> {
        if rules.is_empty() {
            let plan = self.select_all();
            info!(selected = plan.len(), "No selection rules, selected all cases");
            return Ok(plan);
        }

        let mut state = SelectionState::new();
        for (index, value) in rules.iter().enumerate() {
            let raw = RawRule::from_value(index, value)?;
            if !raw.enable {
                debug!(rule = index, content = %value, "Skipping disabled rule");
                continue;
            }
            let rule = SelectionRule::compile(index, raw, value.to_string())?;
            apply_rule(&mut state, self.registry, &rule, self.mode)?;
        }

        info!(
            selected = state.len(),
            rules = rules.len(),
            force_included = state.force_included().len(),
            force_excluded = state.force_excluded().len(),
            "Selected cases"
        );
        Ok(SelectionPlan::new(state.into_plans()))
    }
}

/// Select cases from `registry` with the default override mode.
pub fn select(registry: &CaseRegistry, rules: &[Value]) -> Result<SelectionPlan> {
    SelectionEngine::new(registry).select(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseDescriptor, CaseSettings};
    use crate::error::{ConfigurationError, SelectionError};
    use crate::rule::SelectionAction;
    use serde_json::json;

    fn registry() -> CaseRegistry {
        CaseRegistry::from_cases(vec![
            CaseDescriptor::new("mockclass", "mock_ut1")
                .with_area("a1")
                .with_tags(["t1", "t2"])
                .with_priority(0),
            CaseDescriptor::new("mockclass", "mock_ut2")
                .with_area("a1")
                .with_tags(["t1", "t2"])
                .with_priority(1),
            CaseDescriptor::new("mockclass", "mock_ut3")
                .with_area("a2")
                .with_tags(["t2", "t3"])
                .with_priority(2),
        ])
        .expect("registry")
    }

    fn names(plan: &SelectionPlan) -> Vec<&str> {
        plan.iter().map(CasePlan::name).collect()
    }

    #[test]
    fn test_no_rules_selects_everything() {
        let registry = registry();
        let plan = select(&registry, &[]).unwrap();
        assert_eq!(names(&plan), vec!["mock_ut1", "mock_ut2", "mock_ut3"]);
        for case in &plan {
            assert_eq!(case.settings, CaseSettings::default());
            assert_eq!(case.action, SelectionAction::Include);
        }
    }

    #[test]
    fn test_rules_start_from_empty_selection() {
        let registry = registry();
        let plan = select(&registry, &[json!({ "criteria": { "area": "demo" } })]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_disabled_rule_skipped_without_compiling() {
        let registry = registry();
        let rules = vec![
            json!({ "criteria": { "bogus": 1 }, "action": "nonsense", "enable": false }),
            json!({ "criteria": { "tag": "t3" } }),
        ];
        let plan = select(&registry, &rules).unwrap();
        assert_eq!(names(&plan), vec!["mock_ut3"]);
    }

    #[test]
    fn test_unknown_action_aborts() {
        let registry = registry();
        let rules = vec![json!({}), json!({ "action": "drop" })];
        let err = select(&registry, &rules).unwrap_err();
        assert!(matches!(
            err,
            SelectionError::Configuration(ConfigurationError::UnknownAction { rule_index: 1, .. })
        ));
    }

    #[test]
    fn test_select_drop_select_moves_case_to_end() {
        let registry = registry();
        let rules = vec![
            json!({ "criteria": { "tag": "t2" }, "times": 2 }),
            json!({ "criteria": { "name": "mock_ut1" }, "action": "exclude" }),
            json!({ "criteria": { "name": "mock_ut1" } }),
        ];
        let plan = select(&registry, &rules).unwrap();
        assert_eq!(names(&plan), vec!["mock_ut2", "mock_ut3", "mock_ut1"]);
        assert_eq!(plan.get("mockclass.mock_ut1").map(|p| p.settings.times), Some(1));
        assert_eq!(plan.get("mockclass.mock_ut2").map(|p| p.settings.times), Some(2));
    }

    #[test]
    fn test_explicit_mode_allows_zero_retry() {
        let registry = registry();
        let rules = vec![
            json!({ "criteria": { "name": "mock_ut1" }, "retry": 3 }),
            json!({ "action": "none", "retry": 0 }),
        ];
        let default_plan = select(&registry, &rules).unwrap();
        assert_eq!(default_plan.cases()[0].settings.retry, 3);

        let explicit_plan = SelectionEngine::new(&registry)
            .with_override_mode(OverrideMode::Explicit)
            .select(&rules)
            .unwrap();
        assert_eq!(explicit_plan.cases()[0].settings.retry, 0);
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        let registry = registry();
        let engine = SelectionEngine::new(&registry);
        let rules = vec![json!({ "action": "force_include", "criteria": { "tag": "t1" } })];
        let first = engine.select(&rules).unwrap();
        let all = engine.select(&[]).unwrap();
        let second = engine.select(&rules).unwrap();
        assert_eq!(first, second);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_digest_deterministic_and_order_sensitive() {
        let registry = registry();
        let a = select(&registry, &[json!({ "criteria": { "name": "mock_ut1|mock_ut2" } })]).unwrap();
        let b = select(&registry, &[json!({ "criteria": { "name": "mock_ut2|mock_ut1" } })]).unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let reordered = select(
            &registry,
            &[
                json!({ "criteria": { "name": "mock_ut2" } }),
                json!({ "criteria": { "name": "mock_ut1" } }),
            ],
        )
        .unwrap();
        assert_ne!(a.digest(), reordered.digest());

        let with_settings = select(
            &registry,
            &[json!({ "criteria": { "name": "mock_ut1|mock_ut2" }, "retry": 1 })],
        )
        .unwrap();
        assert_ne!(a.digest(), with_settings.digest());
    }

    #[test]
    fn test_plan_serializes_as_list() {
        let registry = registry();
        let plan = select(&registry, &[json!({ "criteria": { "priority": 0 }, "times": 2 })]).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value[0]["descriptor"]["name"], "mock_ut1");
        assert_eq!(value[0]["settings"]["times"], 2);
        assert_eq!(value[0]["action"], "include");
    }
}
