//! Extension manifest types.
//!
//! An extension manifest is the `package.json` colocated with an extension's
//! compiled output. Only the fields the host reads are modeled; everything
//! else in the file is ignored during parsing, so ordinary npm metadata never
//! invalidates a manifest.

use serde::{Deserialize, Serialize};

use crate::extension::DriverRuntime;

/// A driver declared in a manifest's `contributes.drivers` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributesDriver {
    /// Unique driver identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution environment tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<DriverRuntime>,
    /// Entry module path relative to the extension directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// A datasource declared in a manifest's `contributes.datasources` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributesDatasource {
    /// Unique datasource identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Inline connection-form schema. Most extensions ship a schema module
    /// instead and leave this unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Connection-form layout hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_config: Option<serde_json::Value>,
    /// Documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Whether the host may offer a data preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_preview: Option<bool>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Ids of drivers (from the same manifest) able to serve this datasource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drivers: Option<Vec<String>>,
}

/// The `contributes` section of an extension manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageContributes {
    /// Loadable driver implementations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drivers: Vec<ContributesDriver>,
    /// User-facing connector kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasources: Vec<ContributesDatasource>,
}

/// Conditional targets for one export-map entry.
///
/// Only the conditions the host consults are modeled; bundler-oriented
/// conditions (`import`, `require`, `types`, ...) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportTargets {
    /// Alternate-engine build; overrides the resolved driver entry when
    /// present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bun: Option<String>,
    /// Fallback target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One entry of a manifest's export map.
///
/// Manifests use both the conditional-target form and the plain-path
/// shorthand; only the former can carry the alternate-engine override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    /// Conditional targets keyed by condition name.
    Targets(ExportTargets),
    /// A single module path for all conditions.
    Path(String),
}

/// Subset of a manifest's `exports` map: only the root (`"."`) entry is
/// consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestExports {
    /// Map keyed by subpath.
    Map {
        /// The `"."` export entry.
        #[serde(rename = ".", default, skip_serializing_if = "Option::is_none")]
        root: Option<ExportEntry>,
    },
    /// Whole-map shorthand: one path serving as the root entry.
    Path(String),
}

impl ManifestExports {
    /// The alternate-engine (`bun`) target of the root export, when declared.
    #[must_use]
    pub fn bun_target(&self) -> Option<&str> {
        match self {
            Self::Map {
                root: Some(ExportEntry::Targets(targets)),
            } => targets.bun.as_deref(),
            _ => None,
        }
    }
}

/// An extension manifest: the subset of `package.json` the host reads.
///
/// All fields are optional so that any syntactically valid JSON object
/// parses; a package that declares nothing useful is dropped later by the
/// zero-datasource rule, not by a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Package description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Main entry module, used when a driver declares no `entry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    /// Export map; the root entry may carry an alternate-engine target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<ManifestExports>,
    /// Declared contributions.
    #[serde(default)]
    pub contributes: PackageContributes,
}

impl ExtensionManifest {
    /// The alternate-engine export target, when the manifest declares one.
    #[must_use]
    pub fn bun_export_target(&self) -> Option<&str> {
        self.exports.as_ref().and_then(ManifestExports::bun_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest_json() -> &'static str {
        r#"{
            "name": "@qwery/extension-postgresql",
            "version": "1.2.0",
            "description": "PostgreSQL connector",
            "main": "./dist/index.js",
            "scripts": { "build": "tsup" },
            "dependencies": { "pg": "^8.11.0" },
            "contributes": {
                "drivers": [
                    {
                        "id": "postgresql-driver",
                        "name": "PostgreSQL Driver",
                        "runtime": "node",
                        "entry": "./dist/driver.js"
                    }
                ],
                "datasources": [
                    {
                        "id": "postgresql",
                        "name": "PostgreSQL",
                        "icon": "postgres.svg",
                        "docsUrl": "https://example.com/docs/postgresql",
                        "supportsPreview": true,
                        "drivers": ["postgresql-driver"]
                    }
                ]
            }
        }"#
    }

    #[test]
    fn parses_full_manifest() {
        let manifest: ExtensionManifest = serde_json::from_str(sample_manifest_json()).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("@qwery/extension-postgresql"));
        assert_eq!(manifest.main.as_deref(), Some("./dist/index.js"));
        assert_eq!(manifest.contributes.drivers.len(), 1);
        assert_eq!(manifest.contributes.datasources.len(), 1);

        let driver = &manifest.contributes.drivers[0];
        assert_eq!(driver.id, "postgresql-driver");
        assert_eq!(driver.runtime, Some(DriverRuntime::Node));

        let ds = &manifest.contributes.datasources[0];
        assert_eq!(ds.supports_preview, Some(true));
        assert_eq!(ds.drivers.as_deref(), Some(&["postgresql-driver".to_string()][..]));
    }

    #[test]
    fn parses_minimal_manifest() {
        let manifest: ExtensionManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.name.is_none());
        assert!(manifest.contributes.drivers.is_empty());
        assert!(manifest.contributes.datasources.is_empty());
        assert!(manifest.bun_export_target().is_none());
    }

    #[test]
    fn bun_export_target_from_map() {
        let manifest: ExtensionManifest = serde_json::from_str(
            r#"{
                "exports": { ".": { "bun": "dist/driver.bun.js", "default": "./dist/driver.js" } }
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.bun_export_target(), Some("dist/driver.bun.js"));
    }

    #[test]
    fn exports_string_shorthand_has_no_bun_target() {
        let manifest: ExtensionManifest =
            serde_json::from_str(r#"{ "exports": "./dist/index.js" }"#).unwrap();
        assert!(manifest.bun_export_target().is_none());

        let manifest: ExtensionManifest =
            serde_json::from_str(r#"{ "exports": { ".": "./dist/index.js" } }"#).unwrap();
        assert!(manifest.bun_export_target().is_none());
    }

    #[test]
    fn unknown_runtime_tag_fails_the_manifest() {
        let result: Result<ExtensionManifest, _> = serde_json::from_str(
            r#"{
                "contributes": {
                    "drivers": [{ "id": "x", "name": "X", "runtime": "deno" }]
                }
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn serializes_camel_case_fields() {
        let ds = ContributesDatasource {
            id: "mysql".into(),
            name: "MySQL".into(),
            description: None,
            icon: None,
            schema: None,
            form_config: None,
            docs_url: Some("https://example.com".into()),
            supports_preview: Some(false),
            tags: None,
            drivers: None,
        };
        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["docsUrl"], "https://example.com");
        assert_eq!(json["supportsPreview"], false);
    }
}
