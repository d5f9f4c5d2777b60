//! Selection rules: parsing raw rule records into typed, compiled rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::criteria::MatchCriteria;
use crate::error::ConfigurationError;

/// What a rule does with the cases it matches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAction {
    /// Only merge settings into already selected cases.
    None,

    /// Add matching catalog cases to the selection.
    #[default]
    Include,

    /// Remove matching cases from the selection.
    Exclude,

    /// Include, and lock the cases against later excludes.
    ForceInclude,

    /// Exclude, and lock the cases against later includes.
    ForceExclude,
}

/// Direction of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFamily {
    Noop,
    Include,
    Exclude,
}

impl SelectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionAction::None => "none",
            SelectionAction::Include => "include",
            SelectionAction::Exclude => "exclude",
            SelectionAction::ForceInclude => "force_include",
            SelectionAction::ForceExclude => "force_exclude",
        }
    }

    pub fn family(&self) -> ActionFamily {
        match self {
            SelectionAction::None => ActionFamily::Noop,
            SelectionAction::Include | SelectionAction::ForceInclude => ActionFamily::Include,
            SelectionAction::Exclude | SelectionAction::ForceExclude => ActionFamily::Exclude,
        }
    }

    /// Whether the action places a lock.
    pub fn is_forceful(&self) -> bool {
        matches!(
            self,
            SelectionAction::ForceInclude | SelectionAction::ForceExclude
        )
    }

    /// Whether matched cases receive the rule's settings.
    pub fn updates_settings(&self) -> bool {
        self.family() != ActionFamily::Exclude
    }
}

impl fmt::Display for SelectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionAction {
    type Err = String;

    /// Accepts snake_case keywords and the camelCase force spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SelectionAction::None),
            "include" => Ok(SelectionAction::Include),
            "exclude" => Ok(SelectionAction::Exclude),
            "force_include" | "forceInclude" => Ok(SelectionAction::ForceInclude),
            "force_exclude" | "forceExclude" => Ok(SelectionAction::ForceExclude),
            other => Err(other.to_string()),
        }
    }
}

/// Settings a rule merges into the cases it touches. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    #[serde(
        default,
        alias = "useNewEnvironment",
        skip_serializing_if = "Option::is_none"
    )]
    pub use_new_environment: Option<bool>,

    #[serde(default, alias = "ignoreFailure", skip_serializing_if = "Option::is_none")]
    pub ignore_failure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl SettingsOverride {
    /// Field-wise merge where `other` wins wherever it is present.
    pub fn overlay(self, other: SettingsOverride) -> SettingsOverride {
        let SettingsOverride {
            times,
            retry,
            use_new_environment,
            ignore_failure,
            environment,
        } = other;
        SettingsOverride {
            times: times.or(self.times),
            retry: retry.or(self.retry),
            use_new_environment: use_new_environment.or(self.use_new_environment),
            ignore_failure: ignore_failure.or(self.ignore_failure),
            environment: environment.or(self.environment),
        }
    }
}

/// One rule record as written in run configuration.
///
/// Settings may sit inline on the record or under `settings:`; the nested
/// block wins per field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRule {
    #[serde(default = "default_enable")]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Map<String, Value>>,

    #[serde(
        default,
        alias = "select_action",
        alias = "selectAction",
        skip_serializing_if = "Option::is_none"
    )]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsOverride>,

    #[serde(flatten)]
    pub inline: SettingsOverride,
}

fn default_enable() -> bool {
    true
}

impl RawRule {
    /// Decode the rule at `index` from its untyped form.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value.clone()).map_err(|e| ConfigurationError::MalformedRule {
            rule_index: index,
            rule: value.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Identifies a rule in diagnostics: position, action and raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRef {
    pub index: usize,
    pub action: SelectionAction,
    pub source: String,
}

impl RuleRef {
    pub fn new(index: usize, action: SelectionAction, source: impl Into<String>) -> Self {
        Self {
            index,
            action,
            source: source.into(),
        }
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({}) {}", self.index, self.action, self.source)
    }
}

/// A compiled, enabled selection rule.
#[derive(Debug, Clone)]
pub struct SelectionRule {
    pub index: usize,
    pub criteria: MatchCriteria,
    pub action: SelectionAction,
    pub settings: SettingsOverride,
    source: String,
}

impl SelectionRule {
    /// Compile a decoded rule. `source` is the raw content used in errors.
    pub fn compile(
        index: usize,
        raw: RawRule,
        source: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let source = source.into();
        let action = match raw.action.as_deref() {
            Some(keyword) => keyword.parse::<SelectionAction>().map_err(|action| {
                ConfigurationError::UnknownAction {
                    action,
                    rule_index: index,
                    rule: source.clone(),
                }
            })?,
            None => SelectionAction::default(),
        };

        let criteria = match &raw.criteria {
            Some(map) => MatchCriteria::compile(map).map_err(|e| {
                ConfigurationError::InvalidCriteria {
                    rule_index: index,
                    rule: source.clone(),
                    source: e,
                }
            })?,
            None => MatchCriteria::any(),
        };

        let settings = match raw.settings {
            Some(nested) => raw.inline.overlay(nested),
            None => raw.inline,
        };

        Ok(Self {
            index,
            criteria,
            action,
            settings,
            source,
        })
    }

    /// Decode and compile the rule at `index` in one step.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ConfigurationError> {
        let raw = RawRule::from_value(index, value)?;
        Self::compile(index, raw, value.to_string())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn to_ref(&self) -> RuleRef {
        RuleRef::new(self.index, self.action, self.source.clone())
    }
}
