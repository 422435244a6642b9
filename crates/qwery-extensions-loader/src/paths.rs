//! Extension install path resolution.
//!
//! Computes the candidate directories the discoverer scans. An environment
//! override fully replaces platform detection; otherwise the list is the
//! platform's system-wide install locations followed, always last, by the
//! per-user directory. Ordering matters: during discovery's first-wins
//! deduplication, system-installed extensions beat user-installed ones that
//! share a datasource id.
//!
//! Resolution is recomputed fresh on every call — it is a pure function of
//! the captured environment, never cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::{debug, warn};

/// Environment variable overriding automatic extension path detection.
///
/// Holds one or more paths separated by comma or semicolon.
pub const EXTENSIONS_PATH_ENV_VAR: &str = "QWERY_EXTENSIONS_PATH";

/// Operating system family, as far as install locations differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl Platform {
    fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }
}

/// Snapshot of the environment facts path resolution depends on.
///
/// Captured fresh per call; the resolution itself is a pure function of the
/// snapshot, which lets every platform branch run under test on any build
/// host.
#[derive(Debug, Clone)]
struct Environment {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
    platform: Platform,
}

impl Environment {
    fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
            home: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            platform: Platform::current(),
        }
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Candidate extension directories for the current process.
///
/// When [`EXTENSIONS_PATH_ENV_VAR`] is set to a non-blank value, its
/// comma/semicolon-separated segments are returned verbatim (trimmed, empties
/// dropped) and platform detection is bypassed entirely. Otherwise the
/// platform's system install locations come first and the per-user
/// `<home>/.qwery/extensions` directory is always last; unrecognized
/// platforms yield only the per-user directory. A process without a
/// resolvable home directory skips the per-user entry.
#[must_use]
pub fn default_extension_paths() -> Vec<PathBuf> {
    extension_paths(&Environment::capture())
}

fn extension_paths(env: &Environment) -> Vec<PathBuf> {
    if let Some(raw) = env.var(EXTENSIONS_PATH_ENV_VAR).map(str::trim)
        && !raw.is_empty()
    {
        let paths: Vec<PathBuf> = raw
            .split([',', ';'])
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(PathBuf::from)
            .collect();
        debug!(
            count = paths.len(),
            "Using extension paths from environment override"
        );
        return paths;
    }

    let mut paths = Vec::new();
    match env.platform {
        Platform::MacOs => {
            paths.push(PathBuf::from(
                "/Applications/Qwery.app/Contents/Resources/extensions",
            ));
        },
        Platform::Windows => {
            let program_files = env
                .var("PROGRAMFILES")
                .map_or_else(|| PathBuf::from("C:\\Program Files"), PathBuf::from);
            let program_files_x86 = env
                .var("PROGRAMFILES(X86)")
                .map_or_else(|| PathBuf::from("C:\\Program Files (x86)"), PathBuf::from);
            paths.push(install_subdir(&program_files));
            paths.push(install_subdir(&program_files_x86));

            let local_app_data = env.var("LOCALAPPDATA").map(PathBuf::from).or_else(|| {
                env.home
                    .as_ref()
                    .map(|home| home.join("AppData").join("Local"))
            });
            if let Some(local_app_data) = local_app_data {
                paths.push(install_subdir(&local_app_data.join("Programs")));
            }
        },
        Platform::Linux => {
            paths.push(PathBuf::from("/usr/lib/qwery/extensions"));
            if let Some(app_dir) = env.var("APPDIR") {
                paths.push(
                    PathBuf::from(app_dir)
                        .join("usr")
                        .join("lib")
                        .join("qwery")
                        .join("extensions"),
                );
            }
            if let Some(exe_dir) = &env.exe_dir {
                paths.push(
                    exe_dir
                        .join("..")
                        .join("lib")
                        .join("qwery")
                        .join("extensions"),
                );
            }
        },
        Platform::Other => {},
    }

    if let Some(home) = &env.home {
        paths.push(home.join(".qwery").join("extensions"));
    } else {
        warn!("Home directory unknown, skipping user extensions path");
    }

    paths
}

/// `<base>/Qwery/resources/extensions`.
fn install_subdir(base: &Path) -> PathBuf {
    base.join("Qwery").join("resources").join("extensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_env(platform: Platform) -> Environment {
        Environment {
            vars: HashMap::new(),
            home: Some(PathBuf::from("/home/tester")),
            exe_dir: Some(PathBuf::from("/opt/qwery/bin")),
            platform,
        }
    }

    fn with_var(mut env: Environment, name: &str, value: &str) -> Environment {
        env.vars.insert(name.to_string(), value.to_string());
        env
    }

    #[test]
    fn override_splits_on_comma_and_semicolon() {
        let env = with_var(
            test_env(Platform::Linux),
            EXTENSIONS_PATH_ENV_VAR,
            "/path1,/path2;/path3",
        );
        let paths = extension_paths(&env);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/path1"),
                PathBuf::from("/path2"),
                PathBuf::from("/path3"),
            ]
        );
    }

    #[test]
    fn override_trims_segments_and_drops_empties() {
        let env = with_var(
            test_env(Platform::MacOs),
            EXTENSIONS_PATH_ENV_VAR,
            "  /a , ,; /b ;",
        );
        let paths = extension_paths(&env);
        assert_eq!(paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn blank_override_falls_back_to_platform_detection() {
        let env = with_var(test_env(Platform::Other), EXTENSIONS_PATH_ENV_VAR, "   ");
        let paths = extension_paths(&env);
        assert_eq!(
            paths,
            vec![PathBuf::from("/home/tester").join(".qwery").join("extensions")]
        );
    }

    #[test]
    fn unknown_platform_yields_only_user_path() {
        let paths = extension_paths(&test_env(Platform::Other));
        assert_eq!(
            paths,
            vec![PathBuf::from("/home/tester/.qwery/extensions")]
        );
    }

    #[test]
    fn macos_paths_end_with_user_path() {
        let paths = extension_paths(&test_env(Platform::MacOs));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/Applications/Qwery.app/Contents/Resources/extensions"),
                PathBuf::from("/home/tester/.qwery/extensions"),
            ]
        );
    }

    #[test]
    fn windows_uses_env_vars_when_set() {
        let env = with_var(
            with_var(
                with_var(test_env(Platform::Windows), "PROGRAMFILES", "D:\\PF"),
                "PROGRAMFILES(X86)",
                "D:\\PF86",
            ),
            "LOCALAPPDATA",
            "D:\\Local",
        );
        let paths = extension_paths(&env);
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], install_subdir(Path::new("D:\\PF")));
        assert_eq!(paths[1], install_subdir(Path::new("D:\\PF86")));
        assert_eq!(paths[2], install_subdir(&Path::new("D:\\Local").join("Programs")));
        assert_eq!(paths[3], PathBuf::from("/home/tester/.qwery/extensions"));
    }

    #[test]
    fn windows_falls_back_to_defaults() {
        let paths = extension_paths(&test_env(Platform::Windows));
        assert_eq!(paths[0], install_subdir(Path::new("C:\\Program Files")));
        assert_eq!(paths[1], install_subdir(Path::new("C:\\Program Files (x86)")));
        assert_eq!(
            paths[2],
            install_subdir(
                &PathBuf::from("/home/tester")
                    .join("AppData")
                    .join("Local")
                    .join("Programs")
            )
        );
    }

    #[test]
    fn linux_includes_appdir_variant_when_hinted() {
        let base = extension_paths(&test_env(Platform::Linux));
        assert_eq!(base[0], PathBuf::from("/usr/lib/qwery/extensions"));
        // No APPDIR: system path, exe-relative path, user path.
        assert_eq!(base.len(), 3);

        let env = with_var(test_env(Platform::Linux), "APPDIR", "/tmp/appimage");
        let paths = extension_paths(&env);
        assert_eq!(paths.len(), 4);
        assert_eq!(
            paths[1],
            PathBuf::from("/tmp/appimage")
                .join("usr")
                .join("lib")
                .join("qwery")
                .join("extensions")
        );
    }

    #[test]
    fn linux_exe_relative_path_precedes_user_path() {
        let paths = extension_paths(&test_env(Platform::Linux));
        assert_eq!(
            paths[1],
            PathBuf::from("/opt/qwery/bin")
                .join("..")
                .join("lib")
                .join("qwery")
                .join("extensions")
        );
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/home/tester/.qwery/extensions"))
        );
    }

    #[test]
    fn missing_home_skips_user_path() {
        let mut env = test_env(Platform::Other);
        env.home = None;
        assert!(extension_paths(&env).is_empty());
    }

    #[test]
    fn default_extension_paths_does_not_panic() {
        let _ = default_extension_paths();
    }
}
