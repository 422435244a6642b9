//! Shared extension and driver registries.
//!
//! Both registries are plain maps keyed by id. Callers that share one across
//! tasks wrap it in a lock; the host in `qwery-extensions-loader` does
//! exactly that.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::driver::DriverFactory;
use crate::extension::{DatasourceExtension, DriverRuntime, ExtensionScope};

/// Registry of datasource extensions keyed by datasource id.
///
/// `register` is insert-or-replace: an extension is re-registered when its
/// lazily loaded schema arrives, and a later registration of the same id is
/// taken as a refinement of the same extension.
#[derive(Debug, Default)]
pub struct ExtensionsRegistry {
    extensions: HashMap<String, DatasourceExtension>,
}

impl ExtensionsRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    /// Insert or replace an extension.
    pub fn register(&mut self, extension: DatasourceExtension) {
        if self.extensions.contains_key(&extension.id) {
            debug!(extension_id = %extension.id, "Replacing registered extension");
        } else {
            debug!(extension_id = %extension.id, "Registered extension");
        }
        self.extensions.insert(extension.id.clone(), extension);
    }

    /// Look up an extension by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DatasourceExtension> {
        self.extensions.get(id)
    }

    /// All extensions with the given scope, sorted by id.
    #[must_use]
    pub fn list(&self, scope: ExtensionScope) -> Vec<&DatasourceExtension> {
        let mut list: Vec<&DatasourceExtension> = self
            .extensions
            .values()
            .filter(|ext| ext.scope == scope)
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// A driver factory registered under a driver id, tagged with the runtime it
/// was loaded for.
#[derive(Clone)]
pub struct DriverRegistration {
    /// Driver id the factory serves.
    pub id: String,
    /// The construction function.
    pub factory: DriverFactory,
    /// Runtime the factory was registered for.
    pub runtime: DriverRuntime,
}

impl fmt::Debug for DriverRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistration")
            .field("id", &self.id)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

/// Factory cache keyed by driver id.
///
/// A registration is permanent for the life of the registry: repeated
/// requests for the same driver reuse the cached factory instead of loading
/// the driver module again.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, DriverRegistration>,
}

impl DriverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Insert or replace a factory for a driver id.
    pub fn register(&mut self, id: impl Into<String>, factory: DriverFactory, runtime: DriverRuntime) {
        let id = id.into();
        debug!(driver_id = %id, runtime = %runtime, "Registered driver factory");
        self.drivers.insert(
            id.clone(),
            DriverRegistration {
                id,
                factory,
                runtime,
            },
        );
    }

    /// Cached registration for a driver id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DriverRegistration> {
        self.drivers.get(id)
    }

    /// Whether a factory is cached for the id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    /// All registered driver ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drivers.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of cached factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
