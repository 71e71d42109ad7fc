//! Project configuration file support.
//!
//! Project settings live in `buildkit.toml` at the project root. Every field
//! has a default, so an empty file (or none at all) is a valid configuration.
//! Relative paths are resolved against the project root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "buildkit.toml";

/// Contents of `buildkit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub conan: ConanSection,
    pub build: BuildSection,
}

/// `[project]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Display name; defaults to the project directory name.
    pub name: Option<String>,
}

/// `[conan]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConanSection {
    /// Conan home directory (`CONAN_HOME`); defaults to `<root>/.conan2`.
    pub home: Option<PathBuf>,

    /// Profile created and edited by `buildkit configure`
    pub profile: String,

    /// Value written to `compiler.cppstd`
    pub cppstd: String,

    /// Value written to `*:shared`
    pub shared: bool,

    /// Explicit virtual environment holding the conan executable
    pub venv: Option<PathBuf>,
}

impl Default for ConanSection {
    fn default() -> Self {
        ConanSection {
            home: None,
            profile: "default".to_string(),
            cppstd: "17".to_string(),
            shared: true,
            venv: None,
        }
    }
}

/// `[build]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Build tree root; per-configuration trees live underneath
    pub dir: PathBuf,

    /// Install prefix used by the pack step
    pub dist: PathBuf,
}

impl Default for BuildSection {
    fn default() -> Self {
        BuildSection {
            dir: PathBuf::from("build"),
            dist: PathBuf::from("dist"),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file doesn't exist.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no {} at {}, using defaults", CONFIG_FILE, path.display());
            Ok(Self::default())
        }
    }
}

/// Resolve `path` against `root` unless it is already absolute.
///
/// A leading `~` component stands for the user's home directory.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.conan.profile, "default");
        assert_eq!(config.conan.cppstd, "17");
        assert!(config.conan.shared);
        assert_eq!(config.build.dir, PathBuf::from("build"));
    }

    #[test]
    fn test_partial_config() {
        let config: ProjectConfig = toml::from_str(
            r#"
[project]
name = "Eurora"

[conan]
home = ".conan2"
shared = false
"#,
        )
        .unwrap();

        assert_eq!(config.project.name.as_deref(), Some("Eurora"));
        assert_eq!(config.conan.home, Some(PathBuf::from(".conan2")));
        assert!(!config.conan.shared);
        assert_eq!(config.conan.profile, "default");
        assert_eq!(config.build.dist, PathBuf::from("dist"));
    }

    #[test]
    fn test_load_or_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);

        assert_eq!(
            ProjectConfig::load_or_default(&path).unwrap(),
            ProjectConfig::default()
        );

        std::fs::write(&path, "[build]\ndir = 5\n").unwrap();
        assert!(ProjectConfig::load_or_default(&path).is_err());
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/work/eurora");
        assert_eq!(
            resolve_path(root, Path::new("build")),
            PathBuf::from("/work/eurora/build")
        );
        assert_eq!(
            resolve_path(root, Path::new("/opt/conan")),
            PathBuf::from("/opt/conan")
        );
        if let Some(dirs) = directories::BaseDirs::new() {
            assert_eq!(
                resolve_path(root, Path::new("~/.conan2")),
                dirs.home_dir().join(".conan2")
            );
        }
        assert_eq!(
            resolve_path(root, Path::new("~build")),
            PathBuf::from("/work/eurora/~build")
        );
    }
}
