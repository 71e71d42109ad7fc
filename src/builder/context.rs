//! Build configuration - workflow flags and derived paths for one run.

use std::fmt;
use std::path::PathBuf;

use crate::util::ProjectContext;

/// CMake/Conan build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildType {
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline steps run, plus the flags that shape them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Workflow {
    pub clean: bool,
    pub build: bool,
    pub pack: bool,
    pub test: bool,
    pub debug: bool,
    pub verbose: bool,
}

impl Workflow {
    /// Whether any step is requested at all.
    pub fn any_step(&self) -> bool {
        self.clean || self.build || self.pack || self.test
    }
}

/// Immutable configuration for one pipeline run.
///
/// Created once from CLI flags and the project context, then shared by
/// reference with every step.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub workflow: Workflow,

    /// Project display name
    pub project_name: String,

    /// Directory containing `conanfile.py`
    pub project_root: PathBuf,

    /// Build tree root; per-configuration trees live underneath
    pub build_dir: PathBuf,

    /// Install prefix for the pack step
    pub dist_dir: PathBuf,

    /// Value of `CONAN_HOME` for every conan invocation
    pub conan_home: PathBuf,

    /// Explicit virtual environment, bypassing discovery
    pub venv: Option<PathBuf>,
}

impl BuildConfig {
    /// Derive the run configuration from the project and CLI flags.
    pub fn new(ctx: &ProjectContext, workflow: Workflow) -> Self {
        BuildConfig {
            workflow,
            project_name: ctx.name(),
            project_root: ctx.root().to_path_buf(),
            build_dir: ctx.build_dir(),
            dist_dir: ctx.dist_dir(),
            conan_home: ctx.conan_home(),
            venv: ctx.venv_override(),
        }
    }

    pub fn build_type(&self) -> BuildType {
        if self.workflow.debug {
            BuildType::Debug
        } else {
            BuildType::Release
        }
    }

    /// Build tree for the active build type (`build/Release`).
    pub fn build_root(&self) -> PathBuf {
        self.build_dir.join(self.build_type().as_str())
    }

    /// Locations where Conan's CMakeToolchain may have written
    /// `conan_toolchain.cmake`, most specific first.
    ///
    /// Single-config generators get a per-build-type tree; multi-config
    /// generators (Visual Studio) share `build/generators`.
    pub fn toolchain_candidates(&self) -> Vec<PathBuf> {
        vec![
            self.build_root()
                .join("generators")
                .join("conan_toolchain.cmake"),
            self.build_dir
                .join("generators")
                .join("conan_toolchain.cmake"),
        ]
    }
}
