//! Processor registry
//!
//! Maps endpoint names (the worklet module name or worker script name a meter
//! is configured with) to factories producing [`Processor`]s. A backend looks
//! its endpoint up here when it starts, the same way a worklet module or
//! worker script would be loaded by name.

use super::Processor;
use crate::error::{MeterError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh processor for one backend instance
pub type ProcessorFactory = Arc<dyn Fn() -> Result<Box<dyn Processor>> + Send + Sync>;

/// Endpoint name to processor factory
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `endpoint`, replacing any previous one
    pub fn register<F>(&mut self, endpoint: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Processor>> + Send + Sync + 'static,
    {
        let endpoint = endpoint.into();
        if self
            .factories
            .insert(endpoint.clone(), Arc::new(factory))
            .is_some()
        {
            tracing::debug!(endpoint = %endpoint, "Replaced processor factory");
        }
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.factories.contains_key(endpoint)
    }

    /// Registered endpoint names, sorted
    pub fn endpoints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a processor for `endpoint`
    ///
    /// # Errors
    /// `BackendUnavailable` if nothing is registered under that name; factory
    /// errors are passed through.
    pub fn instantiate(&self, endpoint: &str) -> Result<Box<dyn Processor>> {
        let factory = self.factories.get(endpoint).ok_or_else(|| {
            MeterError::backend_unavailable(format!(
                "no processor registered for endpoint '{}'",
                endpoint
            ))
        })?;
        factory()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
