//! Static catalog of bundled extension packages.
//!
//! First-party extensions ship inside the application bundle rather than in
//! an extensions directory. The embedder lists them in a [`StaticCatalog`]:
//! each entry names the package, points at its entry module on disk, and
//! carries lazy import functions. The host walks upward from the entry
//! module to the package manifest to learn what the package contributes;
//! nothing is evaluated until a driver or schema is actually requested.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::discovery::MANIFEST_FILE_NAME;
use crate::source::{DriverImportFn, SchemaImportFn};

/// One bundled extension package.
pub struct StaticExtensionPackage {
    /// Package name, as in its manifest.
    pub name: String,
    /// Path to the package's entry module on disk. Only used to locate the
    /// manifest; the module itself is loaded through `import`.
    pub entry: PathBuf,
    /// Lazy import of the package module.
    pub import: DriverImportFn,
    /// Lazy import of the package's schema module, when it ships one.
    pub schema_import: Option<SchemaImportFn>,
}

impl StaticExtensionPackage {
    /// Package with a driver import and no schema module.
    #[must_use]
    pub fn new(name: impl Into<String>, entry: impl Into<PathBuf>, import: DriverImportFn) -> Self {
        Self {
            name: name.into(),
            entry: entry.into(),
            import,
            schema_import: None,
        }
    }

    /// Attach a schema module import.
    #[must_use]
    pub fn with_schema_import(mut self, schema_import: SchemaImportFn) -> Self {
        self.schema_import = Some(schema_import);
        self
    }
}

impl fmt::Debug for StaticExtensionPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticExtensionPackage")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("schema_import", &self.schema_import.is_some())
            .finish()
    }
}

/// The packages an embedder bundles with the application.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    packages: Vec<StaticExtensionPackage>,
}

impl StaticCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package to the catalog.
    pub fn push(&mut self, package: StaticExtensionPackage) {
        self.packages.push(package);
    }

    /// Add a package, chaining.
    #[must_use]
    pub fn with_package(mut self, package: StaticExtensionPackage) -> Self {
        self.packages.push(package);
        self
    }

    /// The catalogued packages, in insertion order.
    #[must_use]
    pub fn packages(&self) -> &[StaticExtensionPackage] {
        &self.packages
    }

    /// Number of catalogued packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl IntoIterator for StaticCatalog {
    type Item = StaticExtensionPackage;
    type IntoIter = std::vec::IntoIter<StaticExtensionPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.into_iter()
    }
}

/// Walk upward from an entry module to the nearest `package.json`.
///
/// Starts at the entry's containing directory and checks each ancestor in
/// turn, so a package's own manifest always beats one further up the tree.
#[must_use]
pub fn find_manifest_upward(entry: &Path) -> Option<PathBuf> {
    let start = entry.parent()?;
    for dir in start.ancestors() {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    use qwery_extensions_sdk::DriverModule;

    fn noop_import() -> DriverImportFn {
        Arc::new(|| Box::pin(async { Ok(DriverModule::default()) }))
    }

    #[test]
    fn finds_manifest_in_entry_directory() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join(MANIFEST_FILE_NAME), "{}").unwrap();
        let entry = pkg.join("index.js");
        std::fs::write(&entry, "").unwrap();

        assert_eq!(
            find_manifest_upward(&entry),
            Some(pkg.join(MANIFEST_FILE_NAME))
        );
    }

    #[test]
    fn walks_up_past_nested_build_directories() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg");
        let dist = pkg.join("dist").join("node");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(pkg.join(MANIFEST_FILE_NAME), "{}").unwrap();
        let entry = dist.join("driver.js");
        std::fs::write(&entry, "").unwrap();

        assert_eq!(
            find_manifest_upward(&entry),
            Some(pkg.join(MANIFEST_FILE_NAME))
        );
    }

    #[test]
    fn nearest_manifest_wins_over_ancestors() {
        let tmp = TempDir::new().unwrap();
        let outer = tmp.path().join("workspace");
        let inner = outer.join("pkg");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(outer.join(MANIFEST_FILE_NAME), "{}").unwrap();
        std::fs::write(inner.join(MANIFEST_FILE_NAME), "{}").unwrap();
        let entry = inner.join("index.js");
        std::fs::write(&entry, "").unwrap();

        assert_eq!(
            find_manifest_upward(&entry),
            Some(inner.join(MANIFEST_FILE_NAME))
        );
    }

    #[test]
    fn catalog_preserves_insertion_order() {
        let catalog = StaticCatalog::new()
            .with_package(StaticExtensionPackage::new(
                "@qwery/extension-postgresql",
                "/bundle/pg/index.js",
                noop_import(),
            ))
            .with_package(
                StaticExtensionPackage::new(
                    "@qwery/extension-csv",
                    "/bundle/csv/index.js",
                    noop_import(),
                )
                .with_schema_import(Arc::new(|| {
                    Box::pin(async { Ok(qwery_extensions_sdk::SchemaModule::default()) })
                })),
            );

        assert_eq!(catalog.len(), 2);
        let names: Vec<String> = catalog.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["@qwery/extension-postgresql", "@qwery/extension-csv"]);
    }
}
