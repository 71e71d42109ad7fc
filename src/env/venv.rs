//! Virtual environment discovery.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::BuildkitError;
use crate::util::process::{find_executable, ProcessBuilder};

/// Locate the virtual environment holding the project's Python tooling.
///
/// Checked in order: the explicit override, `VIRTUAL_ENV`, then
/// `pipenv --venv` run from the project root. Absence is not an error.
pub fn find_venv(explicit: Option<&Path>, project_root: &Path) -> Option<PathBuf> {
    let active = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
    find_venv_with(explicit, active, || pipenv_venv(project_root))
}

fn find_venv_with(
    explicit: Option<&Path>,
    active: Option<PathBuf>,
    pipenv: impl FnOnce() -> Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        tracing::debug!("using configured venv {}", path.display());
        return Some(path.to_path_buf());
    }
    if let Some(path) = active.filter(|p| !p.as_os_str().is_empty()) {
        tracing::debug!("using active venv {}", path.display());
        return Some(path);
    }
    pipenv()
}

/// Ask pipenv where the project's environment lives.
fn pipenv_venv(project_root: &Path) -> Option<PathBuf> {
    let pipenv = find_executable("pipenv")?;
    let output = ProcessBuilder::new(pipenv)
        .arg("--venv")
        .cwd(project_root)
        .run(false)
        .map_err(|e| tracing::debug!("pipenv --venv failed: {:#}", e))
        .ok()?;

    if !output.success() {
        tracing::debug!("pipenv has no environment for {}", project_root.display());
        return None;
    }

    let path = output.stdout.lines().last()?.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Build a `pipenv run ...` command rooted at the project.
pub fn pipenv_run<I, S>(project_root: &Path, args: I) -> Result<ProcessBuilder>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let pipenv = find_executable("pipenv").ok_or_else(|| BuildkitError::ToolNotFound {
        tool: "pipenv".to_string(),
        searched: "PATH".to_string(),
    })?;
    Ok(ProcessBuilder::new(pipenv)
        .arg("run")
        .args(args)
        .cwd(project_root))
}
