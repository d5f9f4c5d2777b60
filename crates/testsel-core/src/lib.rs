//! testsel Core - test-case selection and settings engine
//!
//! Computes which test cases run, and with which settings, from a case
//! registry and an ordered list of selection rules:
//! - `include` / `exclude` add or remove matching cases
//! - `force_include` / `force_exclude` also lock cases against later opposite rules
//! - `none` only merges settings into already selected cases
//!
//! Rules are applied strictly in order. Opposing force actions on one case
//! are a fatal [`ConflictError`]; unknown actions, criteria keys or malformed
//! patterns are a fatal [`ConfigurationError`].

pub mod case;
pub mod config;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod processor;
pub mod registry;
pub mod rule;
pub mod settings;
pub mod state;
pub mod telemetry;

// Re-export key types
pub use case::{CaseDescriptor, CasePlan, CaseSettings, DEFAULT_PRIORITY};
pub use config::{load_catalog, CaseEntry, RunConfig};
pub use criteria::{MatchCriteria, PrioritySpec, TagSpec};
pub use engine::{select, SelectionEngine, SelectionPlan};
pub use error::{
    ConfigLoadError, ConfigurationError, ConflictError, CriteriaError, RegistryError, Result,
    SelectionError,
};
pub use processor::{apply_rule, RuleOutcome};
pub use registry::{global, install_global, CaseRegistry};
pub use rule::{RawRule, RuleRef, SelectionAction, SelectionRule, SettingsOverride};
pub use settings::{apply_settings, OverrideMode};
pub use state::{LockSet, SelectionState};
pub use telemetry::{init_tracing, LogFormat};
