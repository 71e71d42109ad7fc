//! The clean, build, pack and test steps.

use std::ffi::{OsStr, OsString};

use anyhow::Result;

use crate::builder::{Step, StepContext, StepKind};
use crate::env::{CMakeRunner, ConanRunner};
use crate::errors::BuildkitError;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::shell::Status;
use crate::util::ProcessBuilder;

/// Removes the build tree of the active build type.
pub struct StepClean;

impl Step for StepClean {
    fn kind(&self) -> StepKind {
        StepKind::Clean
    }

    fn run(&self, cx: &StepContext<'_>) -> Result<()> {
        if !cx.config.workflow.clean {
            return Ok(());
        }

        let build_root = cx.config.build_root();
        cx.shell
            .status(Status::Cleaning, build_root.display());

        if remove_dir_all_if_exists(&build_root)? {
            tracing::info!("removed {}", build_root.display());
            cx.shell.status(Status::Removed, build_root.display());
        } else {
            cx.shell.status(Status::Skipped, "nothing to clean");
        }
        Ok(())
    }
}

/// Installs dependencies and builds the project through Conan.
pub struct StepBuild;

impl StepBuild {
    /// Arguments of the `conan install` and `conan build` invocations.
    fn commands(cx: &StepContext<'_>) -> [Vec<OsString>; 2] {
        let config = cx.config;
        let setting = format!("build_type={}", config.build_type());
        let root = config.project_root.as_os_str();

        let mut install: Vec<OsString> = vec![
            "install".into(),
            root.into(),
            "--build=missing".into(),
            "-s".into(),
            setting.clone().into(),
        ];
        let mut build: Vec<OsString> =
            vec!["build".into(), root.into(), "-s".into(), setting.into()];

        if config.workflow.verbose {
            install.push("-vverbose".into());
            build.push("-vverbose".into());
        }
        [install, build]
    }
}

impl Step for StepBuild {
    fn kind(&self) -> StepKind {
        StepKind::Build
    }

    fn run(&self, cx: &StepContext<'_>) -> Result<()> {
        if !cx.config.workflow.build {
            return Ok(());
        }

        let conan = ConanRunner::locate(cx.config)?;
        let span = cx.shell.span(
            Status::Building,
            format!("{} ({})", cx.config.project_name, cx.config.build_type()),
        );
        for args in Self::commands(cx) {
            conan.stream(cx.shell, &args)?;
        }
        span.finish();
        Ok(())
    }
}

/// Installs the built artifacts into the dist directory.
pub struct StepPack;

impl Step for StepPack {
    fn kind(&self) -> StepKind {
        StepKind::Pack
    }

    fn run(&self, cx: &StepContext<'_>) -> Result<()> {
        if !cx.config.workflow.pack {
            return Ok(());
        }

        let build_root = cx.config.build_root();
        if !build_root.is_dir() {
            return Err(BuildkitError::not_found("build tree", build_root).into());
        }

        let cmake = CMakeRunner::locate(cx.config)?;
        let build_type = cx.config.build_type();
        let span = cx.shell.span(
            Status::Packing,
            format!("into {}", cx.config.dist_dir.display()),
        );
        cmake.stream(
            cx.shell,
            [
                OsStr::new("--install"),
                build_root.as_os_str(),
                OsStr::new("--prefix"),
                cx.config.dist_dir.as_os_str(),
                OsStr::new("--config"),
                OsStr::new(build_type.as_str()),
            ],
        )?;
        span.finish();
        Ok(())
    }
}

/// Runs the project's test suite with ctest.
pub struct StepTest;

impl Step for StepTest {
    fn kind(&self) -> StepKind {
        StepKind::Test
    }

    fn run(&self, cx: &StepContext<'_>) -> Result<()> {
        if !cx.config.workflow.test {
            return Ok(());
        }

        let build_root = cx.config.build_root();
        if !build_root.is_dir() {
            return Err(BuildkitError::not_found("build tree", build_root).into());
        }

        let ctest = CMakeRunner::locate(cx.config)?.ctest()?;
        let build_type = cx.config.build_type();
        let cmd = ProcessBuilder::new(ctest)
            .arg("--test-dir")
            .arg(&build_root)
            .args(["-C", build_type.as_str(), "--output-on-failure"]);

        let span = cx.shell.span(
            Status::Testing,
            format!("{} ({})", cx.config.project_name, build_type),
        );
        cx.shell.verbose(Status::Running, cmd.display_command());
        cmd.stream(true)?;
        span.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::builder::{BuildConfig, Workflow};
    use crate::util::config::ProjectConfig;
    use crate::util::{ProjectContext, Shell};

    fn config_in(root: &Path, workflow: Workflow) -> BuildConfig {
        let mut project = ProjectConfig::default();
        project.project.name = Some("Eurora".to_string());
        project.conan.home = Some(PathBuf::from(".conan2"));
        project.conan.venv = Some(PathBuf::from(".venv"));
        let ctx = ProjectContext::with_config(root.to_path_buf(), project);
        BuildConfig::new(&ctx, workflow)
    }

    fn run_step(step: &dyn Step, config: &BuildConfig) -> Result<()> {
        let shell = Arc::new(Shell::quiet());
        step.run(&StepContext {
            config,
            shell: &shell,
        })
    }

    #[test]
    fn test_clean_removes_active_build_tree() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(
            tmp.path(),
            Workflow {
                clean: true,
                ..Workflow::default()
            },
        );
        let release = config.build_root();
        let debug = config.build_dir.join("Debug");
        std::fs::create_dir_all(release.join("CMakeFiles")).unwrap();
        std::fs::create_dir_all(&debug).unwrap();

        run_step(&StepClean, &config).unwrap();
        assert!(!release.exists());
        assert!(debug.exists());

        // Nothing left to remove is fine.
        run_step(&StepClean, &config).unwrap();
    }

    #[test]
    fn test_steps_skip_when_disabled() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path(), Workflow::default());
        let release = config.build_root();
        std::fs::create_dir_all(&release).unwrap();

        for step in [&StepClean as &dyn Step, &StepBuild, &StepPack, &StepTest] {
            run_step(step, &config).unwrap();
        }
        assert!(release.exists());
    }

    #[test]
    fn test_pack_and_test_need_build_tree() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(
            tmp.path(),
            Workflow {
                pack: true,
                test: true,
                ..Workflow::default()
            },
        );

        for step in [&StepPack as &dyn Step, &StepTest] {
            let err = run_step(step, &config).unwrap_err();
            assert!(err
                .downcast_ref::<BuildkitError>()
                .is_some_and(|e| e.is_not_found()));
        }
    }

    #[test]
    fn test_build_commands() {
        let config = config_in(
            Path::new("/work/eurora"),
            Workflow {
                build: true,
                debug: true,
                verbose: true,
                ..Workflow::default()
            },
        );
        let shell = Arc::new(Shell::quiet());
        let cx = StepContext {
            config: &config,
            shell: &shell,
        };
        let [install, build] = StepBuild::commands(&cx);
        assert_eq!(
            install,
            [
                "install",
                "/work/eurora",
                "--build=missing",
                "-s",
                "build_type=Debug",
                "-vverbose"
            ]
        );
        assert_eq!(
            build,
            ["build", "/work/eurora", "-s", "build_type=Debug", "-vverbose"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_build_runs_conan_with_home() {
        use crate::util::process::write_script;

        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("conan.log");
        write_script(
            &tmp.path().join(".venv").join("bin").join("conan"),
            &format!(
                "if [ \"$1\" = \"--version\" ]; then echo 'Conan version 2.3.0'; exit 0; fi\n\
                 echo \"$CONAN_HOME $*\" >> '{}'",
                log.display()
            ),
        );

        let config = config_in(
            tmp.path(),
            Workflow {
                build: true,
                ..Workflow::default()
            },
        );
        run_step(&StepBuild, &config).unwrap();

        let home = tmp.path().join(".conan2");
        let root = tmp.path().display();
        let expected = format!(
            "{home} install {root} --build=missing -s build_type=Release\n\
             {home} build {root} -s build_type=Release\n",
            home = home.display(),
        );
        assert_eq!(std::fs::read_to_string(&log).unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_verbose_build_echoes_commands() {
        use std::io::Write;
        use std::sync::Mutex;

        use crate::util::process::write_script;
        use crate::util::shell::Verbosity;

        #[derive(Clone, Default)]
        struct Sink(Arc<Mutex<Vec<u8>>>);

        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let tmp = TempDir::new().unwrap();
        write_script(
            &tmp.path().join(".venv").join("bin").join("conan"),
            "if [ \"$1\" = \"--version\" ]; then echo 'Conan version 2.3.0'; fi",
        );
        let config = config_in(
            tmp.path(),
            Workflow {
                build: true,
                ..Workflow::default()
            },
        );

        let sink = Sink::default();
        let shell = Arc::new(Shell::with_writer(
            Verbosity::Verbose,
            false,
            Box::new(sink.clone()),
        ));
        StepBuild
            .run(&StepContext {
                config: &config,
                shell: &shell,
            })
            .unwrap();

        let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let running: Vec<&str> = text
            .lines()
            .filter(|l| l.trim_start().starts_with("Running "))
            .collect();
        assert_eq!(running.len(), 2);
        assert!(running[0].contains(" install "));
        assert!(running[1].contains(" build "));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_failure_propagates() {
        use crate::util::process::write_script;

        let tmp = TempDir::new().unwrap();
        write_script(
            &tmp.path().join(".venv").join("bin").join("conan"),
            "if [ \"$1\" = \"--version\" ]; then echo 'Conan version 2.3.0'; exit 0; fi\nexit 3",
        );
        let config = config_in(
            tmp.path(),
            Workflow {
                build: true,
                ..Workflow::default()
            },
        );

        let err = run_step(&StepBuild, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildkitError>(),
            Some(BuildkitError::CommandFailed { code: Some(3), .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_pack_and_test_use_toolchain_cmake() {
        use crate::util::process::write_script;

        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("tools.log");
        let bin = tmp.path().join("cmake-pkg").join("bin");
        write_script(
            &bin.join("cmake"),
            &format!("echo \"cmake $*\" >> '{}'", log.display()),
        );
        write_script(
            &bin.join("ctest"),
            &format!("echo \"ctest $*\" >> '{}'", log.display()),
        );

        let config = config_in(
            tmp.path(),
            Workflow {
                pack: true,
                test: true,
                ..Workflow::default()
            },
        );
        let generators = config.build_root().join("generators");
        std::fs::create_dir_all(&generators).unwrap();
        std::fs::write(
            generators.join("conan_toolchain.cmake"),
            format!("set(CMAKE_PROGRAM \"{}\")\n", bin.display()),
        )
        .unwrap();

        run_step(&StepPack, &config).unwrap();
        run_step(&StepTest, &config).unwrap();

        let build_root = config.build_root();
        let expected = format!(
            "cmake --install {b} --prefix {d} --config Release\n\
             ctest --test-dir {b} -C Release --output-on-failure\n",
            b = build_root.display(),
            d = config.dist_dir.display(),
        );
        assert_eq!(std::fs::read_to_string(&log).unwrap(), expected);
    }
}
