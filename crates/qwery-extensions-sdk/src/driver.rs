//! Driver capability surface.
//!
//! A driver is the concrete implementation behind a datasource: it connects
//! to, queries, and describes one connector kind. The host never links
//! drivers at build time — it obtains a [`DriverFactory`] from a dynamically
//! loaded module and invokes it once per instance.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::extension::DriverRuntime;
use crate::metadata::{DatasourceMetadata, DatasourceResultSet};

/// A concrete driver instance produced by a factory.
///
/// Implementations own whatever connection state they need; the host only
/// ever talks to them through this trait.
#[async_trait]
pub trait DataSourceDriver: Send + Sync {
    /// Verify that the configured connection is usable.
    async fn test_connection(&self) -> DriverResult<()>;

    /// Execute a query and return its result set.
    async fn query(&self, sql: &str) -> DriverResult<DatasourceResultSet>;

    /// Describe the connected source's schemas, tables, and columns.
    async fn metadata(&self) -> DriverResult<DatasourceMetadata>;

    /// Release held resources. Drivers without persistent state keep the
    /// default no-op.
    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn DataSourceDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceDriver").finish_non_exhaustive()
    }
}

/// Per-instance construction context passed to a [`DriverFactory`].
#[derive(Debug, Clone, Default)]
pub struct DriverContext {
    /// Provider-specific connection settings; opaque to the host.
    pub config: serde_json::Value,
    /// Execution environment. The instance loader fills this from the driver
    /// descriptor when the caller leaves it unset.
    pub runtime: Option<DriverRuntime>,
}

impl DriverContext {
    /// Context wrapping provider-specific connection settings.
    #[must_use]
    pub fn new(config: serde_json::Value) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// Set the execution environment explicitly.
    #[must_use]
    pub fn with_runtime(mut self, runtime: DriverRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

/// Builds a driver instance from a context.
///
/// Factories are cheap to clone and are shared for the life of the host once
/// a driver module has loaded.
pub type DriverFactory =
    Arc<dyn Fn(DriverContext) -> DriverResult<Box<dyn DataSourceDriver>> + Send + Sync>;

/// The shape of a dynamically imported driver module.
///
/// Mirrors the module contract extension builds follow: the construction
/// function is exported under the well-known `driverFactory` name, with the
/// default export as fallback.
#[derive(Clone, Default)]
pub struct DriverModule {
    /// The named construction export.
    pub driver_factory: Option<DriverFactory>,
    /// Default export, used when the named export is absent.
    pub default: Option<DriverFactory>,
}

impl DriverModule {
    /// Module exposing only the named construction export.
    #[must_use]
    pub fn from_factory(factory: DriverFactory) -> Self {
        Self {
            driver_factory: Some(factory),
            default: None,
        }
    }

    /// Extract the construction function: named export first, default
    /// export second.
    #[must_use]
    pub fn into_factory(self) -> Option<DriverFactory> {
        self.driver_factory.or(self.default)
    }
}

impl fmt::Debug for DriverModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverModule")
            .field("driver_factory", &self.driver_factory.is_some())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// The shape of a dynamically imported schema module.
#[derive(Debug, Clone, Default)]
pub struct SchemaModule {
    /// The named `schema` export.
    pub schema: Option<serde_json::Value>,
    /// Default export, used when the named export is absent.
    pub default: Option<serde_json::Value>,
}

impl SchemaModule {
    /// Extract the schema value: named export first, default export second.
    #[must_use]
    pub fn into_schema(self) -> Option<serde_json::Value> {
        self.schema.or(self.default)
    }
}
