//! Conan executable discovery and invocation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::builder::BuildConfig;
use crate::env::venv::find_venv;
use crate::env::ToolInfo;
use crate::errors::BuildkitError;
use crate::util::process::{find_executable, CommandOutput, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Environment variable Conan 2 reads its home directory from.
pub const CONAN_HOME_ENV: &str = "CONAN_HOME";

static CONAN_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*conan version (\S+)").unwrap());

/// Locate conan inside a virtual environment.
///
/// Returns `Ok(None)` when the directory does not exist or holds no conan
/// executable. A conan that runs but prints an unexpected version line is
/// an error.
pub fn find_conan(venv: &Path) -> Result<Option<ToolInfo>> {
    if !venv.is_dir() {
        tracing::warn!(
            "virtual environment {} does not exist or is not a directory",
            venv.display()
        );
        return Ok(None);
    }

    let candidates = [
        venv.join("bin").join("conan"),
        venv.join("Scripts").join("conan.exe"),
    ];

    let Some(path) = candidates.into_iter().find(|p| p.is_file()) else {
        tracing::info!("no conan found in virtual environment {}", venv.display());
        return Ok(None);
    };

    let output = ProcessBuilder::new(&path).arg("--version").exec_and_check()?;
    let version = parse_conan_version(&output.stdout)?;

    tracing::info!("found conan {} in {}", version, venv.display());
    Ok(Some(ToolInfo { path, version }))
}

/// Extract the version from `Conan version 2.0.17`.
pub fn parse_conan_version(output: &str) -> Result<String> {
    CONAN_VERSION_RE
        .captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| BuildkitError::parse_failure("conan", output.trim()).into())
}

/// Find the conan executable for a run: the virtual environment first,
/// then `PATH`.
pub fn resolve_conan(config: &BuildConfig) -> Result<ToolInfo> {
    let venv = find_venv(config.venv.as_deref(), &config.project_root);
    if let Some(venv) = &venv {
        if let Some(info) = find_conan(venv)? {
            return Ok(info);
        }
    }

    if let Some(path) = find_executable("conan") {
        let output = ProcessBuilder::new(&path).arg("--version").exec_and_check()?;
        let version = parse_conan_version(&output.stdout)?;
        tracing::info!("using conan {} from PATH", version);
        return Ok(ToolInfo { path, version });
    }

    let searched = match venv {
        Some(venv) => format!("{} and PATH", venv.display()),
        None => "PATH".to_string(),
    };
    Err(BuildkitError::ToolNotFound {
        tool: "conan".to_string(),
        searched,
    }
    .into())
}

/// Runs conan commands against a fixed Conan home.
#[derive(Debug, Clone)]
pub struct ConanRunner {
    conan: PathBuf,
    home: PathBuf,
}

impl ConanRunner {
    pub fn new(conan: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        ConanRunner {
            conan: conan.into(),
            home: home.into(),
        }
    }

    /// Resolve conan for the given run configuration.
    pub fn locate(config: &BuildConfig) -> Result<Self> {
        let info = resolve_conan(config)?;
        Ok(ConanRunner::new(info.path, &config.conan_home))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn conan(&self) -> &Path {
        &self.conan
    }

    /// Build a conan command with `CONAN_HOME` set.
    ///
    /// A leading `conan` token is replaced by the resolved executable, so
    /// both `["install", "."]` and `["conan", "install", "."]` work.
    pub fn command<I, S>(&self, args: I) -> ProcessBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut args = args.into_iter().peekable();
        if let Some(first) = args.peek() {
            if is_named(first.as_ref(), "conan") {
                args.next();
            }
        }

        ProcessBuilder::new(&self.conan)
            .args(args)
            .env(CONAN_HOME_ENV, self.home.to_string_lossy())
    }

    /// Run with captured output.
    pub fn run<I, S>(&self, args: I, check: bool) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let cmd = self.command(args);
        tracing::debug!("conan home: {}", self.home.display());
        cmd.run(check)
            .with_context(|| format!("conan command failed: {}", cmd.display_command()))
    }

    /// Run with the terminal attached, failing on non-zero exit. A verbose
    /// shell echoes the command line first.
    pub fn stream<I, S>(&self, shell: &Shell, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let cmd = self.command(args);
        shell.verbose(Status::Running, cmd.display_command());
        cmd.stream(true)?;
        Ok(())
    }
}

/// Whether a command token names `tool` (`conan`, `/x/conan`, `conan.exe`).
pub(crate) fn is_named(token: &OsStr, tool: &str) -> bool {
    Path::new(token)
        .file_stem()
        .map(|s| s.to_string_lossy().eq_ignore_ascii_case(tool))
        .unwrap_or(false)
}
