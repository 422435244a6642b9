//! Where driver modules come from.
//!
//! The host never imports modules itself; it asks a [`DriverModuleSource`]
//! for the module of a given driver descriptor. Two sources exist:
//! [`RegisteredDriverSource`] resolves from an in-process table of import
//! functions (the embedded-runtime path), and [`RemoteDriverSource`] fetches
//! driver bundles from a client origin (the remote-UI path). The actual
//! module evaluation is behind [`ModuleImport`], which the embedder wires to
//! its script engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use qwery_extensions_sdk::{DriverExtension, DriverModule, DriverRuntime, SchemaModule};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ImportError, LoaderError, LoaderResult};

/// Deferred import of a driver module. Invoking the function performs the
/// actual module evaluation.
pub type DriverImportFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<DriverModule, ImportError>> + Send + Sync>;

/// Deferred import of a schema module.
pub type SchemaImportFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<SchemaModule, ImportError>> + Send + Sync>;

/// Module evaluation backend supplied by the embedder.
///
/// Implementations bind a script engine's dynamic import: given a module
/// URL, evaluate it and hand back its relevant exports.
#[async_trait]
pub trait ModuleImport: Send + Sync {
    /// Import a driver module from `url`.
    async fn import_driver(&self, url: &Url) -> Result<DriverModule, ImportError>;

    /// Import a schema module from `url`.
    async fn import_schema(&self, url: &Url) -> Result<SchemaModule, ImportError>;
}

/// A place driver modules can be loaded from.
#[async_trait]
pub trait DriverModuleSource: Send + Sync {
    /// Load the module for `driver`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::UnknownDriver`] when this source has no module
    /// for the driver, or [`LoaderError::ModuleLoad`] when the import itself
    /// fails.
    async fn load(&self, driver: &DriverExtension) -> LoaderResult<DriverModule>;
}

/// Import-table source for drivers registered in-process.
///
/// Discovery and the static catalog both register one import function per
/// driver id here; nothing is evaluated until a driver instance is first
/// requested.
#[derive(Default)]
pub struct RegisteredDriverSource {
    imports: RwLock<HashMap<String, DriverImportFn>>,
}

impl RegisteredDriverSource {
    /// Create an empty import table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the import function for a driver id, replacing any previous
    /// registration.
    pub fn register(&self, driver_id: impl Into<String>, import: DriverImportFn) {
        let driver_id = driver_id.into();
        debug!(driver_id, "Registering driver import");
        self.write_imports().insert(driver_id, import);
    }

    /// Whether an import function is registered for `driver_id`.
    #[must_use]
    pub fn contains(&self, driver_id: &str) -> bool {
        self.read_imports().contains_key(driver_id)
    }

    /// All registered driver ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read_imports().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn read_imports(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, DriverImportFn>> {
        self.imports.read().unwrap_or_else(|e| {
            warn!("driver import table lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_imports(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, DriverImportFn>> {
        self.imports.write().unwrap_or_else(|e| {
            warn!("driver import table lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl fmt::Debug for RegisteredDriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredDriverSource")
            .field("registered", &self.read_imports().len())
            .finish()
    }
}

#[async_trait]
impl DriverModuleSource for RegisteredDriverSource {
    async fn load(&self, driver: &DriverExtension) -> LoaderResult<DriverModule> {
        // Clone the import function out of the table so the lock is not
        // held across the await.
        let import = self.read_imports().get(&driver.id).cloned();
        let Some(import) = import else {
            return Err(LoaderError::UnknownDriver {
                driver_id: driver.id.clone(),
                known: self.ids(),
            });
        };

        import().await.map_err(|source| LoaderError::ModuleLoad {
            driver_id: driver.id.clone(),
            source,
        })
    }
}

/// Fetches driver bundles from a client origin.
///
/// Served bundles live at `<origin>/extensions/<driver id>/<entry file>`,
/// where the entry file is the last path segment of the driver's declared
/// entry.
pub struct RemoteDriverSource {
    origin: Url,
    importer: Arc<dyn ModuleImport>,
}

impl RemoteDriverSource {
    /// Source fetching bundles from `origin` through `importer`.
    #[must_use]
    pub fn new(origin: Url, importer: Arc<dyn ModuleImport>) -> Self {
        Self { origin, importer }
    }

    /// The origin bundles are fetched from.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn bundle_url(&self, driver: &DriverExtension) -> Result<Url, ImportError> {
        let file = entry_file_name(driver.entry.as_deref());
        self.origin
            .join(&format!("/extensions/{}/{file}", driver.id))
            .map_err(|e| ImportError::new(e.to_string()))
    }
}

impl fmt::Debug for RemoteDriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDriverSource")
            .field("origin", &self.origin.as_str())
            .finish()
    }
}

#[async_trait]
impl DriverModuleSource for RemoteDriverSource {
    async fn load(&self, driver: &DriverExtension) -> LoaderResult<DriverModule> {
        if driver.runtime == Some(DriverRuntime::Node) {
            return Err(LoaderError::ModuleLoad {
                driver_id: driver.id.clone(),
                source: ImportError::new(
                    "driver requires the Node.js runtime and cannot be fetched remotely",
                ),
            });
        }

        let url = self.bundle_url(driver).map_err(|source| LoaderError::ModuleLoad {
            driver_id: driver.id.clone(),
            source,
        })?;
        debug!(driver_id = driver.id, url = %url, "Fetching driver bundle");

        self.importer
            .import_driver(&url)
            .await
            .map_err(|source| LoaderError::ModuleLoad {
                driver_id: driver.id.clone(),
                source,
            })
    }
}

/// Last path segment of a declared entry, tolerating both separator styles.
fn entry_file_name(entry: Option<&str>) -> &str {
    entry
        .and_then(|e| e.rsplit(['/', '\\']).next())
        .filter(|name| !name.is_empty())
        .unwrap_or("driver.js")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwery_extensions_sdk::{
        DataSourceDriver, DatasourceMetadata, DatasourceResultSet, DriverFactory, DriverResult,
        ResultSetStat, build_metadata_from_information_schema,
    };
    use std::sync::Mutex;

    struct StubDriver;

    #[async_trait]
    impl DataSourceDriver for StubDriver {
        async fn test_connection(&self) -> DriverResult<()> {
            Ok(())
        }

        async fn query(&self, _sql: &str) -> DriverResult<DatasourceResultSet> {
            Ok(DatasourceResultSet {
                columns: vec![],
                rows: vec![],
                stat: ResultSetStat::default(),
            })
        }

        async fn metadata(&self) -> DriverResult<DatasourceMetadata> {
            Ok(build_metadata_from_information_schema("stub", &[], &[], &[]))
        }
    }

    fn stub_factory() -> DriverFactory {
        Arc::new(|_ctx| Ok(Box::new(StubDriver) as Box<dyn DataSourceDriver>))
    }

    fn stub_import() -> DriverImportFn {
        Arc::new(|| Box::pin(async { Ok(DriverModule::from_factory(stub_factory())) }))
    }

    fn driver(id: &str, runtime: Option<DriverRuntime>, entry: Option<&str>) -> DriverExtension {
        DriverExtension {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            runtime,
            entry: entry.map(str::to_string),
        }
    }

    struct CapturingImport {
        requested: Mutex<Vec<Url>>,
    }

    impl CapturingImport {
        fn new() -> Self {
            Self {
                requested: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ModuleImport for CapturingImport {
        async fn import_driver(&self, url: &Url) -> Result<DriverModule, ImportError> {
            self.requested.lock().unwrap().push(url.clone());
            Ok(DriverModule::from_factory(stub_factory()))
        }

        async fn import_schema(&self, _url: &Url) -> Result<SchemaModule, ImportError> {
            Ok(SchemaModule::default())
        }
    }

    #[tokio::test]
    async fn registered_source_loads_known_driver() {
        let source = RegisteredDriverSource::new();
        source.register("pg-driver", stub_import());

        let module = source.load(&driver("pg-driver", None, None)).await.unwrap();
        assert!(module.into_factory().is_some());
    }

    #[tokio::test]
    async fn unknown_driver_error_lists_registered_ids() {
        let source = RegisteredDriverSource::new();
        source.register("b-driver", stub_import());
        source.register("a-driver", stub_import());

        let err = source
            .load(&driver("missing", None, None))
            .await
            .unwrap_err();
        match &err {
            LoaderError::UnknownDriver { driver_id, known } => {
                assert_eq!(driver_id, "missing");
                assert_eq!(known, &["a-driver".to_string(), "b-driver".to_string()]);
            },
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("a-driver, b-driver"));
    }

    #[tokio::test]
    async fn failing_import_surfaces_as_module_load_error() {
        let source = RegisteredDriverSource::new();
        let failing: DriverImportFn =
            Arc::new(|| Box::pin(async { Err(ImportError::new("syntax error in bundle")) }));
        source.register("broken", failing);

        let err = source.load(&driver("broken", None, None)).await.unwrap_err();
        assert!(matches!(err, LoaderError::ModuleLoad { .. }));
        assert!(err.to_string().contains("syntax error in bundle"));
    }

    #[test]
    fn re_registering_replaces_and_ids_stay_sorted() {
        let source = RegisteredDriverSource::new();
        source.register("z-driver", stub_import());
        source.register("a-driver", stub_import());
        source.register("z-driver", stub_import());

        assert_eq!(source.ids(), vec!["a-driver", "z-driver"]);
        assert!(source.contains("a-driver"));
        assert!(!source.contains("m-driver"));
    }

    #[tokio::test]
    async fn remote_source_builds_bundle_url_from_entry_file_name() {
        let importer = Arc::new(CapturingImport::new());
        let source = RemoteDriverSource::new(
            Url::parse("https://app.example.com").unwrap(),
            Arc::clone(&importer) as Arc<dyn ModuleImport>,
        );

        source
            .load(&driver(
                "pg-driver",
                Some(DriverRuntime::Browser),
                Some("./dist/driver.js"),
            ))
            .await
            .unwrap();

        let requested = importer.requested.lock().unwrap();
        assert_eq!(
            requested[0].as_str(),
            "https://app.example.com/extensions/pg-driver/driver.js"
        );
    }

    #[tokio::test]
    async fn remote_source_defaults_entry_file_when_none_declared() {
        let importer = Arc::new(CapturingImport::new());
        let source = RemoteDriverSource::new(
            Url::parse("https://app.example.com").unwrap(),
            Arc::clone(&importer) as Arc<dyn ModuleImport>,
        );

        source
            .load(&driver("csv-driver", Some(DriverRuntime::Browser), None))
            .await
            .unwrap();

        let requested = importer.requested.lock().unwrap();
        assert_eq!(
            requested[0].as_str(),
            "https://app.example.com/extensions/csv-driver/driver.js"
        );
    }

    #[tokio::test]
    async fn remote_source_rejects_node_drivers() {
        let importer = Arc::new(CapturingImport::new());
        let source = RemoteDriverSource::new(
            Url::parse("https://app.example.com").unwrap(),
            importer as Arc<dyn ModuleImport>,
        );

        let err = source
            .load(&driver("pg-driver", Some(DriverRuntime::Node), None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Node.js runtime"));
    }

    #[test]
    fn entry_file_name_takes_last_segment_of_either_separator() {
        assert_eq!(entry_file_name(Some("./dist/driver.js")), "driver.js");
        assert_eq!(entry_file_name(Some("dist\\win\\main.js")), "main.js");
        assert_eq!(entry_file_name(Some("bundle.js")), "bundle.js");
        assert_eq!(entry_file_name(Some("dist/")), "driver.js");
        assert_eq!(entry_file_name(None), "driver.js");
    }
}
