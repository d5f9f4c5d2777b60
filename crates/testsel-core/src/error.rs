//! Error taxonomy for test-case selection.

use std::path::PathBuf;

use thiserror::Error;

use crate::rule::RuleRef;

/// Errors produced while compiling one rule's `criteria` block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("unknown criteria key: {key}")]
    UnknownKey { key: String },

    #[error("invalid pattern '{pattern}' for criteria '{key}': {reason}")]
    InvalidPattern {
        key: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid value for criteria '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A rule that cannot be interpreted. Always fatal; carries the rule content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown select action '{action}' in rule #{rule_index}: {rule}")]
    UnknownAction {
        action: String,
        rule_index: usize,
        rule: String,
    },

    #[error("rule #{rule_index} has invalid criteria: {source}; rule: {rule}")]
    InvalidCriteria {
        rule_index: usize,
        rule: String,
        #[source]
        source: CriteriaError,
    },

    #[error("malformed rule #{rule_index}: {reason}; rule: {rule}")]
    MalformedRule {
        rule_index: usize,
        rule: String,
        reason: String,
    },
}

impl ConfigurationError {
    /// Position of the offending rule in the rule list.
    pub fn rule_index(&self) -> usize {
        match self {
            ConfigurationError::UnknownAction { rule_index, .. }
            | ConfigurationError::InvalidCriteria { rule_index, .. }
            | ConfigurationError::MalformedRule { rule_index, .. } => *rule_index,
        }
    }
}

/// Opposing force actions targeted the same case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("case {case} has force conflict: rule {rule} conflicts with rule {locked_by}")]
pub struct ConflictError {
    /// Full name of the contested case.
    pub case: String,

    /// The rule whose forceful action hit the opposing lock.
    pub rule: RuleRef,

    /// The earlier rule that placed the opposing lock.
    pub locked_by: RuleRef,
}

/// Any fatal outcome of a selection pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("conflict error: {0}")]
    Conflict(#[from] ConflictError),
}

/// Errors raised while registering case descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("case already registered: {0}")]
    DuplicateCase(String),

    #[error("case registry already initialized")]
    AlreadyInitialized,
}

/// Errors raised while reading run configuration or catalog files.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid catalog: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;
