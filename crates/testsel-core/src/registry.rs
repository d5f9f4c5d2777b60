//! Case registry: the read-only catalog selection runs against.
//!
//! Cases are registered explicitly at process start-up. A binary builds one
//! [`CaseRegistry`], then either passes it by reference to the engine or
//! installs it once as the process-wide registry with [`install_global`].

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::case::CaseDescriptor;
use crate::error::RegistryError;

static GLOBAL_REGISTRY: OnceLock<CaseRegistry> = OnceLock::new();

/// Insertion-ordered map from full case name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct CaseRegistry {
    cases: IndexMap<String, Arc<CaseDescriptor>>,
}

impl CaseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors, keeping their order.
    pub fn from_cases<I>(cases: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = CaseDescriptor>,
    {
        let mut registry = Self::new();
        for case in cases {
            registry.register(case)?;
        }
        Ok(registry)
    }

    /// Register one descriptor. Full names must be unique.
    pub fn register(&mut self, case: CaseDescriptor) -> Result<(), RegistryError> {
        if self.cases.contains_key(&case.full_name) {
            return Err(RegistryError::DuplicateCase(case.full_name));
        }
        debug!(case = %case.full_name, suite = %case.suite, "Registered case");
        self.cases.insert(case.full_name.clone(), Arc::new(case));
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_case(mut self, case: CaseDescriptor) -> Result<Self, RegistryError> {
        self.register(case)?;
        Ok(self)
    }

    pub fn get(&self, full_name: &str) -> Option<&Arc<CaseDescriptor>> {
        self.cases.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.cases.contains_key(full_name)
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CaseDescriptor>> {
        self.cases.values()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Install `registry` as the process-wide registry.
///
/// Succeeds once per process; later calls fail with
/// [`RegistryError::AlreadyInitialized`].
pub fn install_global(registry: CaseRegistry) -> Result<&'static CaseRegistry, RegistryError> {
    let count = registry.len();
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInitialized)?;
    debug!(cases = count, "Installed global case registry");
    global().ok_or(RegistryError::AlreadyInitialized)
}

/// The process-wide registry, if one was installed.
pub fn global() -> Option<&'static CaseRegistry> {
    GLOBAL_REGISTRY.get()
}
