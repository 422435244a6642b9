//! Extension discovery from install directories.
//!
//! Scans base paths for subdirectories carrying a `package.json` with a
//! `contributes` section. Discovery is deliberately forgiving: a missing or
//! malformed manifest means "not an extension", never an error, so one
//! broken package cannot abort a scan. Skip reasons are still traced for
//! operators chasing a package that refuses to appear.
//!
//! Datasource ids are deduplicated scan-wide with first-wins semantics.
//! Subdirectories are visited in lexicographic name order so the winner does
//! not depend on filesystem enumeration order; base paths are visited in the
//! order given, which is what makes system-installed extensions take
//! precedence over user-installed ones (see
//! [`default_extension_paths`](crate::paths::default_extension_paths)).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use qwery_extensions_sdk::{ContributesDatasource, ContributesDriver, ExtensionManifest};
use tracing::{debug, info, trace, warn};

use crate::paths::default_extension_paths;

/// Manifest file name expected in every extension directory.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// One package's surviving contribution after scan-wide deduplication.
#[derive(Debug, Clone)]
pub struct DiscoveredExtension {
    /// Directory the extension lives in.
    pub ext_dir: PathBuf,
    /// The parsed manifest.
    pub manifest: ExtensionManifest,
    /// Declared datasources that survived deduplication, in declaration
    /// order.
    pub datasources: Vec<ContributesDatasource>,
    /// All drivers the package declares.
    pub drivers: Vec<ContributesDriver>,
}

/// Discover extensions from the given base paths, or from
/// [`default_extension_paths`] when `None`.
///
/// Base paths that are missing, not directories, or unreadable are skipped
/// without affecting the rest of the scan. Packages contributing zero
/// datasources — before or after deduplication — are dropped entirely.
#[must_use]
pub fn discover_extensions(base_paths: Option<&[PathBuf]>) -> Vec<DiscoveredExtension> {
    let paths = base_paths.map_or_else(default_extension_paths, <[PathBuf]>::to_vec);
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for base_path in &paths {
        if !base_path.is_dir() {
            trace!(path = %base_path.display(), "Skipping missing or non-directory base path");
            continue;
        }

        let entries = match std::fs::read_dir(base_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %base_path.display(), error = %e, "Failed to read extensions directory");
                continue;
            },
        };

        let mut ext_dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        // First-wins dedup must not depend on readdir order.
        ext_dirs.sort();

        for ext_dir in &ext_dirs {
            if let Some(discovered) = scan_extension_dir(ext_dir, &mut seen) {
                results.push(discovered);
            }
        }
    }

    info!(count = results.len(), "Discovered extensions");
    results
}

/// Read one extension directory, returning `None` for anything that is not
/// a usable extension.
fn scan_extension_dir(
    ext_dir: &Path,
    seen: &mut HashSet<String>,
) -> Option<DiscoveredExtension> {
    let manifest = read_extension_manifest(ext_dir)?;

    if manifest.contributes.datasources.is_empty() {
        trace!(path = %ext_dir.display(), "Skipping package without datasources");
        return None;
    }

    let datasources: Vec<ContributesDatasource> = manifest
        .contributes
        .datasources
        .iter()
        .filter(|ds| seen.insert(ds.id.clone()))
        .cloned()
        .collect();
    if datasources.is_empty() {
        debug!(
            path = %ext_dir.display(),
            "Skipping package: every datasource id is already taken"
        );
        return None;
    }

    let drivers = manifest.contributes.drivers.clone();
    Some(DiscoveredExtension {
        ext_dir: ext_dir.to_path_buf(),
        manifest,
        datasources,
        drivers,
    })
}

/// Read and parse a directory's manifest. Absence and malformed content are
/// both "no extension here".
fn read_extension_manifest(ext_dir: &Path) -> Option<ExtensionManifest> {
    let manifest_path = ext_dir.join(MANIFEST_FILE_NAME);
    let content = match std::fs::read_to_string(&manifest_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            trace!(path = %ext_dir.display(), "No manifest file, not an extension");
            return None;
        },
        Err(e) => {
            debug!(path = %manifest_path.display(), error = %e, "Failed to read manifest");
            return None;
        },
    };

    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(
                path = %manifest_path.display(),
                error = %e,
                "Skipping extension with malformed manifest"
            );
            None
        },
    }
}
