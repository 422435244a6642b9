//! Loader error types.
//!
//! Discovery failures are not represented here: a missing, unreadable, or
//! malformed manifest is folded into "no extension found" at the discovery
//! boundary (with a trace of why). Errors below surface to callers because
//! they block a concrete, user-triggered action and must be attributable to
//! a driver id.

use std::path::PathBuf;

use qwery_extensions_sdk::{DriverError, DriverRuntime};

/// Failure raised by an injected [`ModuleImport`](crate::ModuleImport)
/// primitive or a stored import function.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ImportError {
    message: String,
}

impl ImportError {
    /// Wrap an import failure message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors from driver loading and entry resolution.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// No import function is registered for the requested driver id.
    #[error("driver {driver_id} not found. Available drivers: {}", known.join(", "))]
    UnknownDriver {
        /// The driver id that was requested.
        driver_id: String,
        /// Every driver id the import table currently knows, sorted.
        known: Vec<String>,
    },

    /// The driver module import or fetch failed.
    #[error("failed to load driver module for {driver_id}: {source}")]
    ModuleLoad {
        /// The driver whose module failed to load.
        driver_id: String,
        /// The underlying import failure.
        source: ImportError,
    },

    /// The loaded module exposes no usable construction function.
    #[error("driver {driver_id} did not export a driverFactory or default function")]
    MissingFactoryExport {
        /// The driver whose module lacks the export.
        driver_id: String,
    },

    /// Resolution finished without a factory landing in the cache.
    #[error("driver {driver_id} did not register a factory")]
    FactoryNotRegistered {
        /// The driver that failed to register.
        driver_id: String,
    },

    /// No module source is configured for the driver's runtime tag.
    #[error("no module source configured for {runtime} drivers (requested by {driver_id})")]
    RuntimeUnavailable {
        /// The driver that was requested.
        driver_id: String,
        /// The runtime tag no source serves.
        runtime: DriverRuntime,
    },

    /// A declared entry path could not be turned into an absolute module
    /// reference.
    #[error("cannot resolve entry path {path}: {message}")]
    EntryPath {
        /// The path that failed to resolve.
        path: PathBuf,
        /// Failure reason.
        message: String,
    },

    /// A driver factory or instance failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_driver_message_lists_known_ids() {
        let err = LoaderError::UnknownDriver {
            driver_id: "mysql-driver".into(),
            known: vec!["duckdb-driver".into(), "postgresql-driver".into()],
        };
        let message = err.to_string();
        assert!(message.contains("mysql-driver"));
        assert!(message.contains("duckdb-driver, postgresql-driver"));
    }

    #[test]
    fn unknown_driver_message_with_empty_table() {
        let err = LoaderError::UnknownDriver {
            driver_id: "mysql-driver".into(),
            known: vec![],
        };
        assert_eq!(
            err.to_string(),
            "driver mysql-driver not found. Available drivers: "
        );
    }

    #[test]
    fn module_load_carries_cause() {
        let err = LoaderError::ModuleLoad {
            driver_id: "pg".into(),
            source: ImportError::new("fetch dropped"),
        };
        assert_eq!(
            err.to_string(),
            "failed to load driver module for pg: fetch dropped"
        );
    }
}
