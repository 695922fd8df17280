// Per-request registry of named services

use crate::Error;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_log::debug;

/// Named values shared with handlers for one request cycle.
///
/// The application keeps a template registry of shared services and clones
/// it at the start of every request; values are reference counted, so the
/// clone is shallow. There is no removal: the registry simply ends with the
/// request.
///
/// # Examples
///
/// ```
/// use trellis_core::{Error, Registry};
///
/// let mut registry = Registry::new();
/// registry.register("app_name", String::from("blog"));
///
/// let name = registry.get::<String>("app_name").unwrap();
/// assert_eq!(name.as_str(), "blog");
///
/// assert!(matches!(registry.get::<String>("db"), Err(Error::NotRegistered(_))));
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `name`. Last write wins.
    pub fn register<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.register_arc(name, Arc::new(value));
    }

    /// Store an already shared value under `name`. Last write wins.
    pub fn register_arc<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: Arc<T>,
    ) {
        let name = name.into();
        if self.entries.insert(name.clone(), value).is_some() {
            debug!("Registry entry '{}' overwritten", name);
        }
    }

    /// Fetch the value stored under `name`.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, Error> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;

        Arc::clone(entry)
            .downcast::<T>()
            .map_err(|_| Error::RegistryTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
