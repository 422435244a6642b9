//! Extension discovery and datasource driver loading for the Qwery host.
//!
//! Connectors are not compiled into the host: they live as self-describing
//! packages on disk, or ship as a fixed first-party catalog installed as
//! ordinary dependencies. This crate covers everything between "a directory
//! of packages exists" and "a caller holds a ready driver instance":
//!
//! - [`default_extension_paths`]: candidate install locations per platform,
//!   overridable through `QWERY_EXTENSIONS_PATH`
//! - [`discover_extensions`]: manifest scanning with first-wins datasource
//!   deduplication
//! - [`resolve_driver_entry_path`] / [`resolve_schema_path`]: declared entry
//!   points → absolute module references
//! - [`StaticCatalog`]: first-party packages registered at startup with lazy
//!   whole-package imports
//! - [`ExtensionHost`]: the single owned value holding the registries, the
//!   import table, and per-driver load state; produces driver instances on
//!   demand
//!
//! # Loading strategies
//!
//! A driver module is obtained through one [`DriverModuleSource`] per
//! runtime tag: registered import functions for host-process (`node`)
//! drivers, same-origin script fetch for sandboxed client (`browser`)
//! drivers. Both sit on top of an injected [`ModuleImport`] primitive — the
//! host never executes foreign code itself.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod discovery;
pub mod error;
pub mod host;
pub mod paths;
pub mod resolve;
pub mod source;

pub use catalog::{StaticCatalog, StaticExtensionPackage, find_manifest_upward};
pub use discovery::{DiscoveredExtension, MANIFEST_FILE_NAME, discover_extensions};
pub use error::{ImportError, LoaderError, LoaderResult};
pub use host::{ExtensionHost, ExtensionHostBuilder};
pub use paths::{EXTENSIONS_PATH_ENV_VAR, default_extension_paths};
pub use resolve::{
    DEFAULT_DRIVER_ENTRY, SCHEMA_MODULE_PATH, resolve_driver_entry_path, resolve_schema_path,
};
pub use source::{
    DriverImportFn, DriverModuleSource, ModuleImport, RegisteredDriverSource, RemoteDriverSource,
    SchemaImportFn,
};
