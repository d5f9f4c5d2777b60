//! Case descriptors and per-run case plans.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rule::SelectionAction;

/// Priority assigned to a case that does not declare one.
pub const DEFAULT_PRIORITY: i32 = 2;

/// Static metadata for one test case.
///
/// Owned by the [`CaseRegistry`](crate::registry::CaseRegistry) and shared
/// with every plan that selects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseDescriptor {
    /// Registry identity, `"{suite}.{name}"` unless given explicitly.
    pub full_name: String,

    /// Display name; matched by the `name` criteria.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Owning suite name.
    pub suite: String,

    /// Functional area; matched by the `area` criteria.
    pub area: String,

    /// Category; matched by the `category` criteria.
    pub category: String,

    /// Tags; matched by the `tag` criteria.
    pub tags: Vec<String>,

    /// Default priority; matched by the `priority` criteria.
    pub priority: i32,
}

impl CaseDescriptor {
    /// Create a descriptor for `name` inside `suite` with default metadata.
    pub fn new(suite: impl Into<String>, name: impl Into<String>) -> Self {
        let suite = suite.into();
        let name = name.into();
        Self {
            full_name: format!("{}.{}", suite, name),
            name,
            description: String::new(),
            suite,
            area: String::new(),
            category: String::new(),
            tags: Vec::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Override the registry identity.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Add one tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replace the tag set.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the case carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Mutable execution settings of a selected case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseSettings {
    /// How many times the case runs.
    pub times: u32,

    /// How many retries the runner grants on failure.
    pub retry: u32,

    /// Whether the case requires a freshly provisioned environment.
    pub use_new_environment: bool,

    /// Whether a failure of this case is tolerated.
    pub ignore_failure: bool,

    /// Environment the case is pinned to, if any.
    pub environment: Option<String>,
}

impl Default for CaseSettings {
    fn default() -> Self {
        Self {
            times: 1,
            retry: 0,
            use_new_environment: false,
            ignore_failure: false,
            environment: None,
        }
    }
}

/// Selection state and settings of one case for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CasePlan {
    pub descriptor: Arc<CaseDescriptor>,
    pub settings: CaseSettings,

    /// Action of the last rule that merged settings into this plan.
    pub action: SelectionAction,
}

impl CasePlan {
    /// Plan with default settings, as created on first selection.
    pub fn new(descriptor: Arc<CaseDescriptor>) -> Self {
        Self {
            descriptor,
            settings: CaseSettings::default(),
            action: SelectionAction::Include,
        }
    }

    /// Registry identity of the planned case.
    pub fn full_name(&self) -> &str {
        &self.descriptor.full_name
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
