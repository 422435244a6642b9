//! Driver entry point resolution.
//!
//! Turns a driver's declared entry into an absolute `file:` URL under the
//! extension directory. Precedence: a `bun` target in the manifest's root
//! export map overrides everything, then the driver's own `entry`, then the
//! manifest `main`, then [`DEFAULT_DRIVER_ENTRY`].

use std::path::Path;

use qwery_extensions_sdk::ExtensionManifest;
use tracing::debug;
use url::Url;

use crate::error::{LoaderError, LoaderResult};

/// Entry module used when neither the driver nor the manifest names one.
pub const DEFAULT_DRIVER_ENTRY: &str = "./dist/driver.js";

/// Conventional location of a datasource's schema module, relative to the
/// extension directory.
pub const SCHEMA_MODULE_PATH: &str = "dist/schema.js";

/// Resolve a driver's entry module to an absolute `file:` URL.
///
/// `entry` is the driver's declared entry from the manifest's driver
/// contribution; the manifest supplies the export map and `main` fallbacks.
///
/// # Errors
///
/// Returns [`LoaderError::EntryPath`] when the joined path cannot be made
/// absolute or cannot be represented as a file URL.
pub fn resolve_driver_entry_path(
    ext_dir: &Path,
    entry: Option<&str>,
    manifest: Option<&ExtensionManifest>,
) -> LoaderResult<Url> {
    let raw = if let Some(target) = manifest.and_then(ExtensionManifest::bun_export_target) {
        debug!(entry = target, "Using bun export target as driver entry");
        target
    } else {
        entry
            .or_else(|| manifest.and_then(|m| m.main.as_deref()))
            .unwrap_or(DEFAULT_DRIVER_ENTRY)
    };
    file_url_under(ext_dir, raw)
}

/// Resolve the conventional schema module location for an extension
/// directory.
///
/// # Errors
///
/// Returns [`LoaderError::EntryPath`] when the path cannot be made absolute
/// or cannot be represented as a file URL.
pub fn resolve_schema_path(ext_dir: &Path) -> LoaderResult<Url> {
    file_url_under(ext_dir, SCHEMA_MODULE_PATH)
}

fn file_url_under(ext_dir: &Path, relative: &str) -> LoaderResult<Url> {
    // Manifests conventionally write "./dist/driver.js"; strip the one
    // leading "./" so the join stays clean.
    let relative = relative.strip_prefix("./").unwrap_or(relative);
    let joined = ext_dir.join(relative);
    let absolute = std::path::absolute(&joined).map_err(|e| LoaderError::EntryPath {
        path: joined.clone(),
        message: e.to_string(),
    })?;
    Url::from_file_path(&absolute).map_err(|()| LoaderError::EntryPath {
        path: absolute,
        message: "not representable as a file URL".to_string(),
    })
}
