//! CMake discovery, generator detection and invocation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use walkdir::WalkDir;

use crate::builder::BuildConfig;
use crate::env::conan::is_named;
use crate::env::{Platform, ToolInfo};
use crate::errors::BuildkitError;
use crate::util::fs::read_to_string;
use crate::util::process::{find_executable, is_executable, ProcessBuilder};
use crate::util::shell::{Shell, Status};

static CMAKE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cmake version (\d+\.\d+\.\d+)").unwrap());

/// Visual Studio generators probed on Windows, newest first.
const VS_GENERATORS: [&str; 2] = ["Visual Studio 17 2022", "Visual Studio 16 2019"];

/// Locate the CMake that Conan installed into its package cache.
///
/// The cache (`<conan_home>/p`) is walked in file-name order. Every
/// executable named `cmake` is a candidate; the one with the fewest path
/// components wins, ties broken by path order, so the result does not depend
/// on the platform's directory iteration order.
pub fn find_cmake_in_cache(conan_home: &Path) -> Result<ToolInfo> {
    let cache = conan_home.join("p");
    let path = find_in_tree(&cache, "cmake").ok_or_else(|| BuildkitError::ToolNotFound {
        tool: "cmake".to_string(),
        searched: cache.display().to_string(),
    })?;

    let output = ProcessBuilder::new(&path).arg("--version").exec_and_check()?;
    let version = parse_cmake_version(&output.stdout)?;

    tracing::info!("found cmake {} in conan cache {}", version, conan_home.display());
    Ok(ToolInfo { path, version })
}

/// Shallowest executable under `root` whose file stem is `stem`.
fn find_in_tree(root: &Path, stem: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable cache entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_named(entry.file_name(), stem))
        .map(|entry| entry.into_path())
        .filter(|path| is_executable(path))
        .min_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        })
}

/// Extract the version from `cmake version 3.27.9`.
pub fn parse_cmake_version(output: &str) -> Result<String> {
    CMAKE_VERSION_RE
        .captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| BuildkitError::parse_failure("cmake", output.trim()).into())
}

/// Derive the CMake executable from a Conan-generated toolchain file.
///
/// The first line mentioning `CMAKE_PROGRAM` carries the directory of the
/// CMake installation in double quotes.
pub fn cmake_from_toolchain(toolchain_file: &Path) -> Result<PathBuf> {
    cmake_from_toolchain_for(toolchain_file, Platform::current())
}

fn cmake_from_toolchain_for(toolchain_file: &Path, platform: Platform) -> Result<PathBuf> {
    if !toolchain_file.is_file() {
        return Err(BuildkitError::not_found("toolchain file", toolchain_file).into());
    }

    let contents = read_to_string(toolchain_file)?;
    let line = contents
        .lines()
        .find(|line| line.contains("CMAKE_PROGRAM"))
        .ok_or_else(|| {
            BuildkitError::not_found("CMAKE_PROGRAM entry in toolchain file", toolchain_file)
        })?;

    let dir = line
        .split('"')
        .nth(1)
        .ok_or_else(|| BuildkitError::parse_failure("toolchain CMAKE_PROGRAM", line.trim()))?;

    let cmake = Path::new(dir).join(platform.exe_name("cmake"));
    tracing::info!("conan-installed cmake: {}", cmake.display());
    Ok(cmake)
}

/// Find the CMake for a run.
///
/// Order: the toolchain file Conan generated for the active build type, the
/// Conan package cache, then `PATH`.
pub fn resolve_cmake(config: &BuildConfig) -> Result<PathBuf> {
    for toolchain in config.toolchain_candidates() {
        if !toolchain.is_file() {
            continue;
        }
        match cmake_from_toolchain(&toolchain) {
            Ok(cmake) if cmake.is_file() => return Ok(cmake),
            Ok(cmake) => tracing::debug!(
                "toolchain {} points at missing {}",
                toolchain.display(),
                cmake.display()
            ),
            Err(e) => tracing::debug!("{:#}", e),
        }
    }

    match find_cmake_in_cache(&config.conan_home) {
        Ok(info) => return Ok(info.path),
        Err(e) => tracing::debug!("{:#}", e),
    }

    find_executable("cmake").ok_or_else(|| {
        BuildkitError::ToolNotFound {
            tool: "cmake".to_string(),
            searched: format!(
                "toolchain files under {}, conan cache {}, PATH",
                config.build_dir.display(),
                config.conan_home.display()
            ),
        }
        .into()
    })
}

/// Pick a CMake generator for this machine.
///
/// Availability is read from the generator list `cmake --help` prints.
pub fn detect_generator(cmake: &Path) -> Result<String> {
    let help = ProcessBuilder::new(cmake)
        .arg("--help")
        .run(false)
        .map(|out| out.stdout)
        .unwrap_or_default();

    detect_generator_with(Platform::current(), find_executable("ninja").is_some(), |gen| {
        generator_listed(&help, gen)
    })
}

fn detect_generator_with(
    platform: Platform,
    has_ninja: bool,
    available: impl Fn(&str) -> bool,
) -> Result<String> {
    if platform.is_windows() {
        if let Some(gen) = VS_GENERATORS.iter().copied().find(|gen| available(gen)) {
            return Ok(gen.to_string());
        }
        if has_ninja {
            return Ok("Ninja".to_string());
        }
        return Err(BuildkitError::ConfigurationInvalid(
            "no suitable CMake generator found on Windows".to_string(),
        )
        .into());
    }

    if platform.is_unix_like() {
        if has_ninja {
            return Ok("Ninja".to_string());
        }
        if available("Unix Makefiles") {
            return Ok("Unix Makefiles".to_string());
        }
        return Err(BuildkitError::ConfigurationInvalid(
            "no suitable CMake generator found on Unix".to_string(),
        )
        .into());
    }

    Err(BuildkitError::ConfigurationInvalid(format!(
        "unsupported platform for generator detection: {}",
        std::env::consts::OS
    ))
    .into())
}

/// Whether `cmake --help` output lists `generator`. The default generator
/// is marked with a leading `*`.
fn generator_listed(help: &str, generator: &str) -> bool {
    help.lines().any(|line| {
        let entry = line.trim_start().trim_start_matches('*');
        entry.split('=').next().map(str::trim) == Some(generator)
    })
}

/// Runs cmake and its sibling tools from one installation.
#[derive(Debug, Clone)]
pub struct CMakeRunner {
    cmake: PathBuf,
}

impl CMakeRunner {
    pub fn new(cmake: impl Into<PathBuf>) -> Self {
        CMakeRunner {
            cmake: cmake.into(),
        }
    }

    /// Resolve cmake for the given run configuration.
    pub fn locate(config: &BuildConfig) -> Result<Self> {
        Ok(CMakeRunner::new(resolve_cmake(config)?))
    }

    pub fn cmake(&self) -> &Path {
        &self.cmake
    }

    /// The `ctest` shipped next to this cmake, falling back to `PATH`.
    pub fn ctest(&self) -> Result<PathBuf> {
        let name = Platform::current().exe_name("ctest");
        if let Some(dir) = self.cmake.parent() {
            let sibling = dir.join(&name);
            if sibling.is_file() {
                return Ok(sibling);
            }
        }
        find_executable("ctest").ok_or_else(|| {
            BuildkitError::ToolNotFound {
                tool: "ctest".to_string(),
                searched: format!("next to {} and PATH", self.cmake.display()),
            }
            .into()
        })
    }

    /// Build a cmake command, replacing a leading `cmake` token with the
    /// resolved executable.
    pub fn command<I, S>(&self, args: I) -> ProcessBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut args = args.into_iter().peekable();
        if let Some(first) = args.peek() {
            if is_named(first.as_ref(), "cmake") {
                args.next();
            }
        }
        ProcessBuilder::new(&self.cmake).args(args)
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_cmake_version() {
        let out = "cmake version 3.27.9\n\nCMake suite maintained and supported by Kitware.\n";
        assert_eq!(parse_cmake_version(out).unwrap(), "3.27.9");

        let err = parse_cmake_version("ninja 1.11").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildkitError>(),
            Some(BuildkitError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_cmake_from_toolchain() {
        let tmp = TempDir::new().unwrap();
        let toolchain = tmp.path().join("conan_toolchain.cmake");
        std::fs::write(
            &toolchain,
            "# Conan automatically generated toolchain file\n\
             set(CMAKE_BUILD_TYPE \"Release\")\n\
             set(CMAKE_PROGRAM \"/c/p/cmake7f1/p/bin\")\n",
        )
        .unwrap();

        assert_eq!(
            cmake_from_toolchain_for(&toolchain, Platform::Linux).unwrap(),
            PathBuf::from("/c/p/cmake7f1/p/bin/cmake")
        );
        assert_eq!(
            cmake_from_toolchain_for(&toolchain, Platform::Windows).unwrap(),
            PathBuf::from("/c/p/cmake7f1/p/bin/cmake.exe")
        );
    }

    #[test]
    fn test_cmake_from_toolchain_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.cmake");
        let err = cmake_from_toolchain(&missing).unwrap_err();
        assert!(err
            .downcast_ref::<BuildkitError>()
            .is_some_and(|e| e.is_not_found()));

        let no_entry = tmp.path().join("no_entry.cmake");
        std::fs::write(&no_entry, "set(CMAKE_CXX_STANDARD 17)\n").unwrap();
        let err = cmake_from_toolchain(&no_entry).unwrap_err();
        assert!(err
            .downcast_ref::<BuildkitError>()
            .is_some_and(|e| e.is_not_found()));

        let unquoted = tmp.path().join("unquoted.cmake");
        std::fs::write(&unquoted, "set(CMAKE_PROGRAM /usr/bin)\n").unwrap();
        let err = cmake_from_toolchain(&unquoted).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildkitError>(),
            Some(BuildkitError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_find_cmake_in_empty_cache() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("p").join("zlib1a2b")).unwrap();

        let err = find_cmake_in_cache(tmp.path()).unwrap_err();
        assert!(err
            .downcast_ref::<BuildkitError>()
            .is_some_and(|e| e.is_not_found()));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_cmake_prefers_shallowest() {
        use crate::util::process::write_script;

        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("p");
        let deep = cache.join("aaa1").join("p").join("share").join("bin").join("cmake");
        let shallow = cache.join("zzz9").join("p").join("bin").join("cmake");
        write_script(&deep, "echo 'cmake version 3.20.0'");
        write_script(&shallow, "echo 'cmake version 3.28.1'");
        // Not executable: ignored even though it is the shallowest match.
        std::fs::write(cache.join("cmake"), "").unwrap();

        let info = find_cmake_in_cache(tmp.path()).unwrap();
        assert_eq!(info.path, shallow);
        assert_eq!(info.version, "3.28.1");
    }

    #[test]
    fn test_detect_generator_unix() {
        let gen = detect_generator_with(Platform::Linux, true, |_| false).unwrap();
        assert_eq!(gen, "Ninja");

        let gen =
            detect_generator_with(Platform::Linux, false, |g| g == "Unix Makefiles").unwrap();
        assert_eq!(gen, "Unix Makefiles");

        let err = detect_generator_with(Platform::MacOs, false, |_| false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildkitError>(),
            Some(BuildkitError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn test_detect_generator_windows() {
        let gen = detect_generator_with(Platform::Windows, true, |g| {
            g == "Visual Studio 16 2019"
        })
        .unwrap();
        assert_eq!(gen, "Visual Studio 16 2019");

        let gen = detect_generator_with(Platform::Windows, true, |_| false).unwrap();
        assert_eq!(gen, "Ninja");

        assert!(detect_generator_with(Platform::Windows, false, |_| false).is_err());
        assert!(detect_generator_with(Platform::Unsupported, true, |_| true).is_err());
    }

    #[test]
    fn test_generator_listed() {
        let help = "Generators\n\n\
                    The following generators are available on this platform (* marks default):\n\
                    * Unix Makefiles               = Generates standard UNIX makefiles.\n\
                    \x20 Ninja                        = Generates build.ninja files.\n\
                    \x20 Ninja Multi-Config           = Generates build-<Config>.ninja files.\n";
        assert!(generator_listed(help, "Unix Makefiles"));
        assert!(generator_listed(help, "Ninja"));
        assert!(generator_listed(help, "Ninja Multi-Config"));
        assert!(!generator_listed(help, "Visual Studio 17 2022"));
        assert!(!generator_listed(help, "Unix"));
    }

    #[test]
    fn test_command_replaces_program() {
        let runner = CMakeRunner::new("/c/p/cmake/bin/cmake");
        let cmd = runner.command(["cmake", "--install", "build/Release"]);
        assert_eq!(cmd.get_program(), Path::new("/c/p/cmake/bin/cmake"));
        assert_eq!(cmd.get_args(), ["--install", "build/Release"]);

        let cmd = runner.command(["--build", "build/Release"]);
        assert_eq!(cmd.get_args(), ["--build", "build/Release"]);
    }
}
