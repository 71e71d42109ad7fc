//! Project context.
//!
//! Locates the project root and exposes the paths derived from it and from
//! `buildkit.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::BuildkitError;
use crate::util::config::{resolve_path, ProjectConfig, CONFIG_FILE};

/// Name of the project descriptor Conan reads.
pub const DESCRIPTOR_FILE: &str = "conanfile.py";

/// Project root plus its loaded configuration.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    config: ProjectConfig,
}

impl ProjectContext {
    /// Discover the project from the current working directory.
    pub fn discover() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Discover the project starting at `start` and searching upward.
    ///
    /// The first directory holding `buildkit.toml` or `conanfile.py` is the
    /// project root.
    pub fn discover_from(start: &Path) -> Result<Self> {
        let root = find_project_root(start)?;
        Self::at(root)
    }

    /// Open the project rooted exactly at `root`.
    pub fn at(root: PathBuf) -> Result<Self> {
        let config = ProjectConfig::load_or_default(&root.join(CONFIG_FILE))?;
        Ok(ProjectContext { root, config })
    }

    /// Build a context from parts, without touching the filesystem.
    pub fn with_config(root: PathBuf, config: ProjectConfig) -> Self {
        ProjectContext { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Project display name.
    pub fn name(&self) -> String {
        self.config
            .project
            .name
            .clone()
            .or_else(|| {
                self.root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    /// Build tree root.
    pub fn build_dir(&self) -> PathBuf {
        resolve_path(&self.root, &self.config.build.dir)
    }

    /// Install prefix for packaged artifacts.
    pub fn dist_dir(&self) -> PathBuf {
        resolve_path(&self.root, &self.config.build.dist)
    }

    /// Conan home directory. Unless configured it lives inside the project,
    /// so `configure --fresh` never touches the user's global cache.
    pub fn conan_home(&self) -> PathBuf {
        match &self.config.conan.home {
            Some(home) => resolve_path(&self.root, home),
            None => self.root.join(".conan2"),
        }
    }

    /// Explicitly configured virtual environment, if any.
    pub fn venv_override(&self) -> Option<PathBuf> {
        self.config
            .conan
            .venv
            .as_ref()
            .map(|v| resolve_path(&self.root, v))
    }

    /// Path of a named profile inside the Conan home.
    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.conan_home().join("profiles").join(name)
    }

    /// Path of the project descriptor.
    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_FILE)
    }
}

fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() || current.join(DESCRIPTOR_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(BuildkitError::not_found(
                format!("{} or {}", CONFIG_FILE, DESCRIPTOR_FILE),
                start,
            )
            .into());
        }
    }
}
