//! The extension host.
//!
//! One [`ExtensionHost`] owns everything the loading pipeline shares: the
//! extensions registry, the driver factory cache, the import table, and the
//! per-driver load state. Embedders construct a host at startup, register
//! extensions from folders or a static catalog, and request driver instances
//! from it; nothing lives in process-wide state.
//!
//! Driver modules load lazily and at most once per driver id. A load that
//! fails leaves the driver unloaded, so a later request retries; a load that
//! succeeds is permanent for the life of the host.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use qwery_extensions_sdk::{
    ContributesDatasource, ContributesDriver, DataSourceDriver, DatasourceExtension,
    DriverContext, DriverExtension, DriverRegistration, DriverRegistry, DriverRuntime,
    ExtensionManifest, ExtensionScope, ExtensionsRegistry,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::{StaticCatalog, StaticExtensionPackage, find_manifest_upward};
use crate::discovery::{DiscoveredExtension, discover_extensions};
use crate::error::{LoaderError, LoaderResult};
use crate::resolve::{resolve_driver_entry_path, resolve_schema_path};
use crate::source::{
    DriverImportFn, DriverModuleSource, ModuleImport, RegisteredDriverSource, RemoteDriverSource,
    SchemaImportFn,
};

/// Where a datasource's schema module can be loaded from later.
#[derive(Clone)]
enum SchemaSource {
    /// Conventional `dist/schema.js` under the extension directory.
    Folder { ext_dir: PathBuf },
    /// Schema module shipped inside a bundled package.
    Package { import: SchemaImportFn },
}

/// Owns extension state and loads driver modules on demand.
pub struct ExtensionHost {
    extensions: RwLock<ExtensionsRegistry>,
    drivers: RwLock<DriverRegistry>,
    registered: RegisteredDriverSource,
    remote: Option<RemoteDriverSource>,
    module_import: Arc<dyn ModuleImport>,
    schema_sources: Mutex<HashMap<String, SchemaSource>>,
    loads: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl ExtensionHost {
    /// Start building a host around the embedder's module import backend.
    #[must_use]
    pub fn builder(module_import: Arc<dyn ModuleImport>) -> ExtensionHostBuilder {
        ExtensionHostBuilder {
            module_import,
            client_origin: None,
        }
    }

    /// Discover extensions under `base_paths` (or the platform defaults when
    /// `None`) and register everything they contribute.
    ///
    /// Driver imports are registered lazily; no module is evaluated here.
    pub fn register_extensions_from_folders(&self, base_paths: Option<&[PathBuf]>) {
        for ext in discover_extensions(base_paths) {
            self.register_discovered(&ext);
        }
    }

    /// Register the packages of a static catalog.
    ///
    /// A package whose manifest cannot be found or parsed is skipped without
    /// affecting the rest of the catalog.
    pub fn register_static_catalog(&self, catalog: StaticCatalog) {
        for package in catalog {
            self.register_static_package(&package);
        }
    }

    /// Register an import function for a driver id directly, replacing any
    /// previous registration.
    pub fn register_driver_import(&self, driver_id: impl Into<String>, import: DriverImportFn) {
        self.registered.register(driver_id, import);
    }

    /// Get a driver instance, loading the driver module first if needed.
    ///
    /// Concurrent requests for the same driver share one load; once a driver
    /// has loaded, its factory is reused for every later instance. The
    /// context's `runtime` is filled from the driver descriptor when the
    /// caller leaves it unset.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::UnknownDriver`] when no import is registered
    /// for the driver, [`LoaderError::ModuleLoad`] when the import fails,
    /// [`LoaderError::MissingFactoryExport`] when the module exports no
    /// construction function, and [`LoaderError::RuntimeUnavailable`] when
    /// the driver's runtime has no configured source. Factory failures come
    /// back as [`LoaderError::Driver`].
    pub async fn driver_instance(
        &self,
        driver: &DriverExtension,
        context: DriverContext,
    ) -> LoaderResult<Box<dyn DataSourceDriver>> {
        if let Some(registration) = self.driver_registration(&driver.id) {
            return Self::invoke(&registration, driver, context);
        }

        let cell = self.load_cell(&driver.id);
        cell.get_or_try_init(|| self.load_and_register(driver))
            .await?;

        let registration =
            self.driver_registration(&driver.id)
                .ok_or_else(|| LoaderError::FactoryNotRegistered {
                    driver_id: driver.id.clone(),
                })?;
        Self::invoke(&registration, driver, context)
    }

    /// Load a datasource's schema into its registry entry.
    ///
    /// A no-op when the datasource is unknown, already has a schema, or has
    /// no recorded schema source. Load failures are logged and swallowed;
    /// a missing schema never makes a datasource unusable.
    pub async fn load_datasource_schema(&self, datasource_id: &str) {
        let existing = self.extension(datasource_id);
        let Some(mut ext) = existing else {
            debug!(datasource_id, "Schema requested for unknown datasource");
            return;
        };
        if ext.schema.is_some() {
            return;
        }

        let source = self.lock_schema_sources().get(datasource_id).cloned();
        let Some(source) = source else {
            debug!(datasource_id, "No schema source recorded");
            return;
        };

        let module = match source {
            SchemaSource::Folder { ext_dir } => {
                let url = match resolve_schema_path(&ext_dir) {
                    Ok(url) => url,
                    Err(e) => {
                        debug!(datasource_id, error = %e, "Cannot resolve schema module path");
                        return;
                    },
                };
                match self.module_import.import_schema(&url).await {
                    Ok(module) => module,
                    Err(e) => {
                        debug!(datasource_id, error = %e, "Schema module import failed");
                        return;
                    },
                }
            },
            SchemaSource::Package { import } => match import().await {
                Ok(module) => module,
                Err(e) => {
                    debug!(datasource_id, error = %e, "Schema module import failed");
                    return;
                },
            },
        };

        let Some(schema) = module.into_schema() else {
            debug!(datasource_id, "Schema module exports nothing usable");
            return;
        };
        ext.schema = Some(schema);
        self.write_extensions().register(ext);
        debug!(datasource_id, "Datasource schema loaded");
    }

    /// A registered extension, by datasource id.
    #[must_use]
    pub fn extension(&self, datasource_id: &str) -> Option<DatasourceExtension> {
        self.read_extensions().get(datasource_id).cloned()
    }

    /// All registered extensions with the given scope, sorted by id.
    #[must_use]
    pub fn list_extensions(&self, scope: ExtensionScope) -> Vec<DatasourceExtension> {
        self.read_extensions()
            .list(scope)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Driver ids with a registered import function, sorted.
    #[must_use]
    pub fn available_driver_ids(&self) -> Vec<String> {
        self.registered.ids()
    }

    /// Driver ids whose modules have loaded, sorted.
    #[must_use]
    pub fn loaded_driver_ids(&self) -> Vec<String> {
        self.read_drivers().ids()
    }

    /// Whether a driver's module has loaded.
    #[must_use]
    pub fn is_driver_loaded(&self, driver_id: &str) -> bool {
        self.read_drivers().contains(driver_id)
    }

    fn register_discovered(&self, ext: &DiscoveredExtension) {
        for driver in &ext.drivers {
            if driver.runtime == Some(DriverRuntime::Browser) {
                // Served from the client origin at load time.
                continue;
            }
            let url = match resolve_driver_entry_path(
                &ext.ext_dir,
                driver.entry.as_deref(),
                Some(&ext.manifest),
            ) {
                Ok(url) => url,
                Err(e) => {
                    warn!(driver_id = %driver.id, error = %e, "Skipping driver with unresolvable entry");
                    continue;
                },
            };
            self.registered
                .register(&driver.id, self.file_import(url));
        }

        for ds in &ext.datasources {
            let drivers = Self::driver_descriptors(ds, &ext.drivers);
            let extension = Self::datasource_extension(ds, drivers);
            self.write_extensions().register(extension);
            self.lock_schema_sources().insert(
                ds.id.clone(),
                SchemaSource::Folder {
                    ext_dir: ext.ext_dir.clone(),
                },
            );
        }
        info!(
            path = %ext.ext_dir.display(),
            datasources = ext.datasources.len(),
            "Registered extension"
        );
    }

    fn register_static_package(&self, package: &StaticExtensionPackage) {
        let Some(manifest_path) = find_manifest_upward(&package.entry) else {
            warn!(
                package = %package.name,
                entry = %package.entry.display(),
                "No manifest found for bundled package"
            );
            return;
        };
        let content = match std::fs::read_to_string(&manifest_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(package = %package.name, error = %e, "Failed to read bundled manifest");
                return;
            },
        };
        let manifest: ExtensionManifest = match serde_json::from_str(&content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(package = %package.name, error = %e, "Failed to parse bundled manifest");
                return;
            },
        };

        for driver in &manifest.contributes.drivers {
            self.registered
                .register(&driver.id, Arc::clone(&package.import));
        }

        for ds in &manifest.contributes.datasources {
            let drivers = Self::driver_descriptors(ds, &manifest.contributes.drivers);
            let mut extension = Self::datasource_extension(ds, drivers);
            // The schema arrives lazily through the package's schema module.
            extension.schema = None;
            self.write_extensions().register(extension);
            if let Some(schema_import) = &package.schema_import {
                self.lock_schema_sources().insert(
                    ds.id.clone(),
                    SchemaSource::Package {
                        import: Arc::clone(schema_import),
                    },
                );
            }
        }
        info!(package = %package.name, "Registered bundled package");
    }

    async fn load_and_register(&self, driver: &DriverExtension) -> LoaderResult<()> {
        let runtime = driver.runtime.unwrap_or(DriverRuntime::Node);
        debug!(driver_id = %driver.id, runtime = %runtime, "Loading driver module");

        let module = match runtime {
            DriverRuntime::Node => self.registered.load(driver).await?,
            DriverRuntime::Browser => {
                let Some(remote) = &self.remote else {
                    return Err(LoaderError::RuntimeUnavailable {
                        driver_id: driver.id.clone(),
                        runtime,
                    });
                };
                remote.load(driver).await?
            },
        };

        let factory = module
            .into_factory()
            .ok_or_else(|| LoaderError::MissingFactoryExport {
                driver_id: driver.id.clone(),
            })?;
        self.write_drivers().register(&driver.id, factory, runtime);
        info!(driver_id = %driver.id, runtime = %runtime, "Driver loaded");
        Ok(())
    }

    fn invoke(
        registration: &DriverRegistration,
        driver: &DriverExtension,
        mut context: DriverContext,
    ) -> LoaderResult<Box<dyn DataSourceDriver>> {
        let runtime = context
            .runtime
            .or(driver.runtime)
            .unwrap_or(registration.runtime);
        context.runtime = Some(runtime);
        Ok((registration.factory)(context)?)
    }

    /// Import function evaluating the module at a fixed file URL.
    fn file_import(&self, url: Url) -> DriverImportFn {
        let importer = Arc::clone(&self.module_import);
        Arc::new(move || {
            let importer = Arc::clone(&importer);
            let url = url.clone();
            Box::pin(async move { importer.import_driver(&url).await })
        })
    }

    fn driver_descriptors(
        ds: &ContributesDatasource,
        declared: &[ContributesDriver],
    ) -> Vec<DriverExtension> {
        let Some(ids) = &ds.drivers else {
            return vec![];
        };
        ids.iter()
            .filter_map(|id| {
                let found = declared.iter().find(|driver| &driver.id == id);
                if found.is_none() {
                    debug!(datasource_id = %ds.id, driver_id = %id, "Datasource names an undeclared driver");
                }
                found
            })
            .map(|driver| DriverExtension {
                id: driver.id.clone(),
                name: driver.name.clone(),
                description: driver.description.clone(),
                runtime: driver.runtime,
                entry: driver.entry.clone(),
            })
            .collect()
    }

    fn datasource_extension(
        ds: &ContributesDatasource,
        drivers: Vec<DriverExtension>,
    ) -> DatasourceExtension {
        DatasourceExtension {
            id: ds.id.clone(),
            name: ds.name.clone(),
            icon: ds.icon.clone().unwrap_or_default(),
            description: ds.description.clone(),
            tags: ds.tags.clone(),
            scope: ExtensionScope::Datasource,
            schema: ds.schema.clone(),
            form_config: ds.form_config.clone(),
            docs_url: ds.docs_url.clone(),
            supports_preview: ds.supports_preview.unwrap_or(false),
            drivers,
        }
    }

    fn driver_registration(&self, driver_id: &str) -> Option<DriverRegistration> {
        self.read_drivers().get(driver_id).cloned()
    }

    fn load_cell(&self, driver_id: &str) -> Arc<OnceCell<()>> {
        let mut loads = self.loads.lock().unwrap_or_else(|e| {
            warn!("driver load table lock poisoned, recovering");
            e.into_inner()
        });
        Arc::clone(loads.entry(driver_id.to_string()).or_default())
    }

    fn read_extensions(&self) -> std::sync::RwLockReadGuard<'_, ExtensionsRegistry> {
        self.extensions.read().unwrap_or_else(|e| {
            warn!("extensions registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_extensions(&self) -> std::sync::RwLockWriteGuard<'_, ExtensionsRegistry> {
        self.extensions.write().unwrap_or_else(|e| {
            warn!("extensions registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn read_drivers(&self) -> std::sync::RwLockReadGuard<'_, DriverRegistry> {
        self.drivers.read().unwrap_or_else(|e| {
            warn!("driver registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_drivers(&self) -> std::sync::RwLockWriteGuard<'_, DriverRegistry> {
        self.drivers.write().unwrap_or_else(|e| {
            warn!("driver registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn lock_schema_sources(&self) -> std::sync::MutexGuard<'_, HashMap<String, SchemaSource>> {
        self.schema_sources.lock().unwrap_or_else(|e| {
            warn!("schema source table lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("extensions", &self.read_extensions().len())
            .field("available_drivers", &self.registered.ids().len())
            .field("loaded_drivers", &self.read_drivers().len())
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds an [`ExtensionHost`].
pub struct ExtensionHostBuilder {
    module_import: Arc<dyn ModuleImport>,
    client_origin: Option<Url>,
}

impl ExtensionHostBuilder {
    /// Serve browser drivers from this origin. Without one, requests for
    /// browser drivers fail with [`LoaderError::RuntimeUnavailable`].
    #[must_use]
    pub fn with_client_origin(mut self, origin: Url) -> Self {
        self.client_origin = Some(origin);
        self
    }

    /// Build the host.
    #[must_use]
    pub fn build(self) -> ExtensionHost {
        let remote = self
            .client_origin
            .map(|origin| RemoteDriverSource::new(origin, Arc::clone(&self.module_import)));
        ExtensionHost {
            extensions: RwLock::new(ExtensionsRegistry::new()),
            drivers: RwLock::new(DriverRegistry::new()),
            registered: RegisteredDriverSource::new(),
            remote,
            module_import: self.module_import,
            schema_sources: Mutex::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for ExtensionHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHostBuilder")
            .field(
                "client_origin",
                &self.client_origin.as_ref().map(Url::as_str),
            )
            .finish_non_exhaustive()
    }
}
