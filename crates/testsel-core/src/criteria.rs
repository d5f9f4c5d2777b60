//! Match criteria: compiles a rule's `criteria` block into case predicates.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::case::CaseDescriptor;
use crate::error::CriteriaError;

const KEY_NAME: &str = "name";
const KEY_AREA: &str = "area";
const KEY_CATEGORY: &str = "category";
const KEY_PRIORITY: &str = "priority";
const KEY_TAG: &str = "tag";

/// A regex that must match the whole field, never a substring.
#[derive(Debug, Clone)]
pub struct FullMatch {
    source: String,
    regex: Regex,
}

impl FullMatch {
    /// Compile `pattern` anchored at both ends.
    ///
    /// The pattern is validated on its own first, so an unbalanced group can
    /// never close the anchoring wrapper. The `(?x)` newline ends a trailing
    /// verbose-mode comment before the closing anchor and is otherwise ignored.
    pub fn new(key: &str, pattern: &str) -> Result<Self, CriteriaError> {
        let invalid = |e: regex::Error| CriteriaError::InvalidPattern {
            key: key.to_string(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        };
        Regex::new(pattern).map_err(invalid)?;
        let regex = Regex::new(&format!("^(?:{}(?x)\n)$", pattern)).map_err(invalid)?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, content: &str) -> bool {
        self.regex.is_match(content)
    }

    /// The pattern as written in the rule.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Priority criteria: one value or any of a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PrioritySpec {
    One(i32),
    AnyOf(Vec<i32>),
}

impl PrioritySpec {
    pub fn matches(&self, priority: i32) -> bool {
        match self {
            PrioritySpec::One(p) => *p == priority,
            PrioritySpec::AnyOf(set) => set.contains(&priority),
        }
    }
}

/// Tag criteria: one tag or any of a set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TagSpec {
    One(String),
    AnyOf(Vec<String>),
}

impl TagSpec {
    pub fn matches(&self, case: &CaseDescriptor) -> bool {
        match self {
            TagSpec::One(tag) => case.has_tag(tag),
            TagSpec::AnyOf(tags) => tags.iter().any(|t| case.has_tag(t)),
        }
    }
}

/// Compiled criteria of one rule. Every present predicate must hold.
#[derive(Debug, Clone, Default)]
pub struct MatchCriteria {
    pub name: Option<FullMatch>,
    pub area: Option<FullMatch>,
    pub category: Option<FullMatch>,
    pub priority: Option<PrioritySpec>,
    pub tag: Option<TagSpec>,
}

impl MatchCriteria {
    /// Criteria that match every case.
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile a raw `criteria` mapping. Unknown keys are rejected.
    pub fn compile(raw: &Map<String, Value>) -> Result<Self, CriteriaError> {
        let mut criteria = Self::default();
        for (key, value) in raw {
            match key.as_str() {
                KEY_NAME => criteria.name = Some(compile_pattern(key, value)?),
                KEY_AREA => criteria.area = Some(compile_pattern(key, value)?),
                KEY_CATEGORY => criteria.category = Some(compile_pattern(key, value)?),
                KEY_PRIORITY => criteria.priority = Some(parse_value(key, value)?),
                KEY_TAG => criteria.tag = Some(parse_value(key, value)?),
                _ => return Err(CriteriaError::UnknownKey { key: key.clone() }),
            }
        }
        Ok(criteria)
    }

    /// Conjunction of all compiled predicates.
    pub fn matches(&self, case: &CaseDescriptor) -> bool {
        self.name.as_ref().map_or(true, |p| p.is_match(&case.name))
            && self.area.as_ref().map_or(true, |p| p.is_match(&case.area))
            && self
                .category
                .as_ref()
                .map_or(true, |p| p.is_match(&case.category))
            && self
                .priority
                .as_ref()
                .map_or(true, |p| p.matches(case.priority))
            && self.tag.as_ref().map_or(true, |t| t.matches(case))
    }

    /// Number of compiled predicates.
    pub fn len(&self) -> usize {
        [
            self.name.is_some(),
            self.area.is_some(),
            self.category.is_some(),
            self.priority.is_some(),
            self.tag.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile_pattern(key: &str, value: &Value) -> Result<FullMatch, CriteriaError> {
    let pattern = value.as_str().ok_or_else(|| CriteriaError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected a string pattern, got {}", value),
    })?;
    FullMatch::new(key, pattern)
}

fn parse_value<T: for<'de> Deserialize<'de>>(key: &str, value: &Value) -> Result<T, CriteriaError> {
    serde_json::from_value(value.clone()).map_err(|_| CriteriaError::InvalidValue {
        key: key.to_string(),
        reason: format!("unsupported value {}", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(raw: Value) -> Result<MatchCriteria, CriteriaError> {
        MatchCriteria::compile(raw.as_object().expect("criteria object"))
    }

    fn sample() -> CaseDescriptor {
        CaseDescriptor::new("mockclass", "mock_ut1")
            .with_area("a1")
            .with_category("c1")
            .with_tags(["t1", "t2"])
            .with_priority(0)
    }

    #[test]
    fn test_empty_criteria_matches_everything() {
        let criteria = compile(json!({})).unwrap();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&sample()));
        assert!(MatchCriteria::any().matches(&CaseDescriptor::new("x", "y")));
    }

    #[test]
    fn test_name_is_full_match_not_substring() {
        let case = sample();
        assert!(compile(json!({ "name": "mock_ut1" })).unwrap().matches(&case));
        assert!(compile(json!({ "name": "mock_ut\\d" })).unwrap().matches(&case));
        assert!(!compile(json!({ "name": "ut1" })).unwrap().matches(&case));
        assert!(!compile(json!({ "name": "mock" })).unwrap().matches(&case));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let criteria = compile(json!({ "name": "mock|mock_ut1" })).unwrap();
        assert!(criteria.matches(&sample()));

        let criteria = compile(json!({ "name": "x|mock_ut" })).unwrap();
        assert!(!criteria.matches(&sample()));
    }

    #[test]
    fn test_area_and_category() {
        let case = sample();
        assert!(compile(json!({ "area": "a1", "category": "c\\d" }))
            .unwrap()
            .matches(&case));
        assert!(!compile(json!({ "area": "a1", "category": "c2" }))
            .unwrap()
            .matches(&case));
    }

    #[test]
    fn test_priority_scalar_and_set() {
        let case = sample();
        assert!(compile(json!({ "priority": 0 })).unwrap().matches(&case));
        assert!(!compile(json!({ "priority": 1 })).unwrap().matches(&case));
        assert!(compile(json!({ "priority": [1, 0] })).unwrap().matches(&case));
        assert!(!compile(json!({ "priority": [1, 2] })).unwrap().matches(&case));
    }

    #[test]
    fn test_tag_or_semantics() {
        let with_b = CaseDescriptor::new("s", "x").with_tag("b");
        let with_c = CaseDescriptor::new("s", "y").with_tag("c");
        let criteria = compile(json!({ "tag": ["a", "b"] })).unwrap();
        assert!(criteria.matches(&with_b));
        assert!(!criteria.matches(&with_c));

        let single = compile(json!({ "tag": "c" })).unwrap();
        assert!(single.matches(&with_c));
        assert!(!single.matches(&with_b));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = compile(json!({ "owner": "me" })).unwrap_err();
        assert_eq!(
            err,
            CriteriaError::UnknownKey {
                key: "owner".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_pattern_is_rejected() {
        let err = compile(json!({ "name": "mock_(" })).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidPattern { ref key, .. } if key == "name"));
    }

    #[test]
    fn test_unbalanced_group_cannot_escape_anchors() {
        for pattern in ["mock)|(zzz", "xx)|(?:ut1"] {
            let err = compile(json!({ "name": pattern })).unwrap_err();
            assert!(
                matches!(err, CriteriaError::InvalidPattern { pattern: ref p, .. } if p == pattern),
                "pattern {pattern} should be rejected"
            );
        }
    }

    #[test]
    fn test_verbose_pattern_with_trailing_comment() {
        let criteria = compile(json!({ "name": "(?x) mock _ut1  # display name" })).unwrap();
        assert!(criteria.matches(&sample()));
        assert!(!criteria.matches(&CaseDescriptor::new("mockclass", "mock_ut10")));
        assert!(!criteria.matches(&CaseDescriptor::new("mockclass", "xmock_ut1")));
    }

    #[test]
    fn test_anchored_pattern_does_not_match_newline_suffix() {
        let criteria = compile(json!({ "name": "mock_ut1" })).unwrap();
        assert!(!criteria.matches(&CaseDescriptor::new("mockclass", "mock_ut1\n")));
    }

    #[test]
    fn test_wrong_value_shapes_are_rejected() {
        assert!(matches!(
            compile(json!({ "priority": "high" })),
            Err(CriteriaError::InvalidValue { ref key, .. }) if key == "priority"
        ));
        assert!(matches!(
            compile(json!({ "tag": 3 })),
            Err(CriteriaError::InvalidValue { ref key, .. }) if key == "tag"
        ));
        assert!(matches!(
            compile(json!({ "area": ["a1"] })),
            Err(CriteriaError::InvalidValue { ref key, .. }) if key == "area"
        ));
    }

    #[test]
    fn test_predicate_count() {
        let criteria = compile(json!({ "name": "x", "tag": "t", "priority": [1] })).unwrap();
        assert_eq!(criteria.len(), 3);
        assert_eq!(criteria.name.as_ref().map(FullMatch::as_str), Some("x"));
    }
}
