//! Extension and datasource driver data model for the Qwery host.
//!
//! Provides the shapes shared between the host and extension authors:
//!
//! - [`ExtensionManifest`]: the `package.json` subset carrying a `contributes` section
//! - [`DatasourceExtension`] / [`DriverExtension`]: registry-facing descriptors
//! - [`DataSourceDriver`]: the capability trait a loaded driver implements
//! - [`DriverFactory`] / [`DriverModule`]: what a dynamically imported driver
//!   module must expose
//! - [`ExtensionsRegistry`] / [`DriverRegistry`]: shared lookup tables keyed by id
//! - [`build_metadata_from_information_schema`]: metadata assembly helper for
//!   SQL-backed drivers
//!
//! # Identity
//!
//! Datasource and driver ids are plain strings, unique per registry. The
//! discovery layer (in `qwery-extensions-loader`) enforces first-wins
//! deduplication of datasource ids; driver ids key both the factory cache and
//! the import-function table, so a collision there means the later driver is
//! unreachable.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod driver;
pub mod error;
pub mod extension;
pub mod manifest;
pub mod metadata;
pub mod registry;

pub use driver::{DataSourceDriver, DriverContext, DriverFactory, DriverModule, SchemaModule};
pub use error::{DriverError, DriverResult};
pub use extension::{DatasourceExtension, DriverExtension, DriverRuntime, ExtensionScope};
pub use manifest::{
    ContributesDatasource, ContributesDriver, ExportEntry, ExportTargets, ExtensionManifest,
    ManifestExports, PackageContributes,
};
pub use metadata::{
    ColumnInfo, DatasourceMetadata, DatasourceResultSet, ForeignKeyRow, InformationSchemaRow,
    PrimaryKeyColumn, PrimaryKeyRow, Relationship, ResultSetColumn, ResultSetStat, SchemaInfo,
    TableInfo, build_metadata_from_information_schema,
};
pub use registry::{DriverRegistration, DriverRegistry, ExtensionsRegistry};
