//! Toolchain discovery report.
//!
//! `buildkit env` shows what the build steps would pick up on this machine
//! without running any of them.

use std::fmt::Write;
use std::path::PathBuf;

use crate::builder::BuildConfig;
use crate::env::{detect_generator, find_venv, resolve_cmake, resolve_conan, Platform};

/// One discovered (or missing) piece of the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: &'static str,
    pub found: bool,
    /// Location and version when found, the reason otherwise
    pub detail: String,
}

impl EnvEntry {
    pub fn found(name: &'static str, detail: impl Into<String>) -> Self {
        EnvEntry {
            name,
            found: true,
            detail: detail.into(),
        }
    }

    pub fn missing(name: &'static str, detail: impl Into<String>) -> Self {
        EnvEntry {
            name,
            found: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvReport {
    pub platform: Platform,
    pub project_root: PathBuf,
    pub conan_home: PathBuf,
    pub entries: Vec<EnvEntry>,
}

impl EnvReport {
    pub fn all_found(&self) -> bool {
        self.entries.iter().all(|e| e.found)
    }

    pub fn get(&self, name: &str) -> Option<&EnvEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Probe the virtual environment, conan, cmake and the CMake generator.
///
/// Lookup failures are recorded in the report instead of being returned.
pub fn inspect(config: &BuildConfig) -> EnvReport {
    let mut entries = Vec::new();

    entries.push(match find_venv(config.venv.as_deref(), &config.project_root) {
        Some(venv) => EnvEntry::found("venv", venv.display().to_string()),
        None => EnvEntry::missing("venv", "no configured, active or pipenv environment"),
    });

    entries.push(match resolve_conan(config) {
        Ok(info) => EnvEntry::found("conan", info.to_string()),
        Err(e) => EnvEntry::missing("conan", format!("{:#}", e)),
    });

    match resolve_cmake(config) {
        Ok(cmake) => {
            entries.push(EnvEntry::found("cmake", cmake.display().to_string()));
            entries.push(match detect_generator(&cmake) {
                Ok(generator) => EnvEntry::found("generator", generator),
                Err(e) => EnvEntry::missing("generator", format!("{:#}", e)),
            });
        }
        Err(e) => {
            entries.push(EnvEntry::missing("cmake", format!("{:#}", e)));
            entries.push(EnvEntry::missing("generator", "needs cmake"));
        }
    }

    EnvReport {
        platform: Platform::current(),
        project_root: config.project_root.clone(),
        conan_home: config.conan_home.clone(),
        entries,
    }
}

/// Render a report for the terminal.
pub fn format_report(report: &EnvReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "platform:    {:?}", report.platform);
    let _ = writeln!(out, "project:     {}", report.project_root.display());
    let _ = writeln!(out, "conan home:  {}", report.conan_home.display());
    let _ = writeln!(out);

    for entry in &report.entries {
        let mark = if entry.found { "[OK]" } else { "[!!]" };
        let _ = writeln!(out, "  {} {:<10} {}", mark, entry.name, entry.detail);
    }
    out
}
