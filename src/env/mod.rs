//! Environment discovery.
//!
//! Finds the virtual environment that carries the conan executable, the
//! CMake that Conan installed into its cache, and the generator CMake should
//! use on this machine.

pub mod cmake;
pub mod conan;
pub mod platform;
pub mod venv;

use std::fmt;
use std::path::PathBuf;

pub use cmake::{detect_generator, find_cmake_in_cache, resolve_cmake, CMakeRunner};
pub use conan::{find_conan, resolve_conan, ConanRunner};
pub use platform::Platform;
pub use venv::find_venv;

/// A discovered executable and the version it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub path: PathBuf,
    pub version: String,
}

impl fmt::Display for ToolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.version)
    }
}

/// Parse a possibly abbreviated version (`9`, `11.4`, `3.27.1`) for
/// comparison. Missing components are zero; suffixes such as `-rc1` or
/// `+git` are ignored.
pub fn lenient_version(text: &str) -> Option<semver::Version> {
    let core = text
        .trim()
        .split(|c: char| c == '-' || c == '+')
        .next()
        .unwrap_or_default();

    let mut parts = core.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().transpose().ok()?.unwrap_or(0);
    let patch = parts.next().transpose().ok()?.unwrap_or(0);
    Some(semver::Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_version() {
        assert_eq!(lenient_version("9"), Some(semver::Version::new(9, 0, 0)));
        assert_eq!(lenient_version("11.4"), Some(semver::Version::new(11, 4, 0)));
        assert_eq!(
            lenient_version("3.27.1-rc2"),
            Some(semver::Version::new(3, 27, 1))
        );
        assert_eq!(lenient_version("gcc"), None);
        assert_eq!(lenient_version(""), None);
    }
}
