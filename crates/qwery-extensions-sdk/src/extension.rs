//! Extension descriptor types.
//!
//! These are the registry-facing shapes: what an extension *is* once its
//! manifest has been read, independent of where it was discovered. Wire
//! names follow the manifest contract (camelCase, lowercase scope and
//! runtime tags).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of contribution an extension registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionScope {
    /// A user-facing connector kind (the common case).
    Datasource,
    /// A bare driver implementation.
    Driver,
    /// A lifecycle hook.
    Hook,
    /// A callable tool.
    Tool,
    /// An autonomous agent.
    Agent,
    /// A reusable skill.
    Skill,
}

impl ExtensionScope {
    /// Wire name of this scope.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Datasource => "datasource",
            Self::Driver => "driver",
            Self::Hook => "hook",
            Self::Tool => "tool",
            Self::Agent => "agent",
            Self::Skill => "skill",
        }
    }
}

impl fmt::Display for ExtensionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a driver implementation executes.
///
/// `Node` drivers are imported into the host process; `Browser` drivers are
/// fetched as same-origin scripts and run inside the sandboxed client
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverRuntime {
    /// Host-process execution (the default when a manifest omits the tag).
    Node,
    /// Sandboxed client execution via same-origin script loading.
    Browser,
}

impl DriverRuntime {
    /// Wire name of this runtime tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for DriverRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loadable driver implementation, as handed to the instance loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverExtension {
    /// Unique driver identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution environment; `None` is treated as [`DriverRuntime::Node`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<DriverRuntime>,
    /// Entry module path relative to the extension directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// A registered datasource: the user-facing connector kind plus the drivers
/// able to serve it.
///
/// `schema` starts out unset for catalog-registered extensions and is filled
/// in lazily when the connection form first needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceExtension {
    /// Unique datasource identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Icon reference; empty when the manifest declares none.
    #[serde(default)]
    pub icon: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form tags for filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// What this extension contributes.
    pub scope: ExtensionScope,
    /// Connection-form schema, or `None` until lazily loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Connection-form layout overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_config: Option<serde_json::Value>,
    /// Documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Whether the host may offer a data preview for this datasource.
    #[serde(default)]
    pub supports_preview: bool,
    /// Drivers able to serve this datasource.
    #[serde(default)]
    pub drivers: Vec<DriverExtension>,
}
