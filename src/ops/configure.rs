//! Conan home and profile setup.
//!
//! `buildkit configure` prepares everything the build step expects:
//! conan installed in the project's pipenv environment, a Conan home, and a
//! profile carrying the project's C++ standard and linkage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::builder::{BuildConfig, Workflow};
use crate::env::venv::pipenv_run;
use crate::env::{ConanRunner, Platform};
use crate::profile::{update_profile, validate_profile};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::shell::{Shell, Status};
use crate::util::ProjectContext;

/// Options for [`configure`].
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Delete the Conan home before initializing it
    pub fresh: bool,

    /// Run `pip install conan` in the pipenv environment first
    pub install_conan: bool,
}

/// Prepare the Conan home and profile for `ctx`. Returns the profile path.
pub fn configure(
    ctx: &ProjectContext,
    shell: &Arc<Shell>,
    opts: &ConfigureOptions,
) -> Result<PathBuf> {
    if opts.install_conan {
        install_conan(ctx, shell)?;
    }

    let config = BuildConfig::new(ctx, Workflow::default());
    let conan = ConanRunner::locate(&config)?;
    let span = shell.span(
        Status::Configuring,
        format!("conan home {}", conan.home().display()),
    );

    initialize_conan_home(&conan, opts.fresh)?;

    let settings = &ctx.config().conan;
    let profile = initialize_profile(
        &conan,
        &settings.profile,
        &settings.cppstd,
        settings.shared,
        Platform::current(),
    )?;
    validate_profile(&profile, &settings.cppstd)?;

    span.finish();
    shell.status(Status::Updated, profile.display());
    Ok(profile)
}

/// Install conan into the project's pipenv environment.
pub fn install_conan(ctx: &ProjectContext, shell: &Arc<Shell>) -> Result<()> {
    let cmd = pipenv_run(ctx.root(), ["pip", "install", "conan"])?;
    let span = shell.span(Status::Running, "pip install conan");
    shell.verbose(Status::Running, cmd.display_command());
    cmd.stream(true)?;
    span.finish();
    Ok(())
}

/// Make sure the Conan home exists, wiping it first when `fresh` is set.
pub fn initialize_conan_home(conan: &ConanRunner, fresh: bool) -> Result<()> {
    let home = conan.home();
    if fresh && remove_dir_all_if_exists(home)? {
        tracing::info!("removed existing conan home {}", home.display());
    }
    ensure_dir(home)?;

    let output = conan.run(["config", "home"], true)?;
    tracing::debug!("conan reports home {}", output.stdout.trim());
    Ok(())
}

/// Ensure profile `name` exists and carries the project's settings.
///
/// A missing profile is created with `conan profile detect`.
pub fn initialize_profile(
    conan: &ConanRunner,
    name: &str,
    cppstd: &str,
    shared: bool,
    platform: Platform,
) -> Result<PathBuf> {
    let show = conan.run(["profile", "show", "--profile", name], false)?;
    if show.success() {
        tracing::info!("profile `{}` exists", name);
    } else {
        tracing::warn!("profile `{}` not found; running conan profile detect", name);
        conan.run(["profile", "detect", "--name", name], true)?;
    }

    let path = conan.home().join("profiles").join(name);
    for (section, key, value) in profile_settings(cppstd, shared, platform) {
        update_profile(&path, section, key, Some(&value))?;
    }
    Ok(path)
}

/// Entries `configure` writes into the profile.
pub fn profile_settings(
    cppstd: &str,
    shared: bool,
    platform: Platform,
) -> Vec<(&'static str, &'static str, String)> {
    let shared = if shared { "True" } else { "False" };
    let mut entries = vec![
        ("settings", "compiler.cppstd", cppstd.to_string()),
        ("options", "*:shared", shared.to_string()),
    ];
    if platform.is_linux() {
        entries.push(("settings", "compiler.libcxx", "libstdc++11".to_string()));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::util::config::ProjectConfig;

    #[test]
    fn test_profile_settings() {
        let linux = profile_settings("20", true, Platform::Linux);
        assert_eq!(
            linux,
            vec![
                ("settings", "compiler.cppstd", "20".to_string()),
                ("options", "*:shared", "True".to_string()),
                ("settings", "compiler.libcxx", "libstdc++11".to_string()),
            ]
        );

        let windows = profile_settings("17", false, Platform::Windows);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].2, "False");
    }

    #[cfg(unix)]
    fn fake_conan(root: &Path) {
        use crate::util::process::write_script;

        write_script(
            &root.join(".venv").join("bin").join("conan"),
            r#"case "$1 $2" in
  "config home") echo "$CONAN_HOME" ;;
  "profile show") exit 1 ;;
  "profile detect")
    mkdir -p "$CONAN_HOME/profiles"
    printf '[settings]\nos=Linux\ncompiler=gcc\ncompiler.version=13\ncompiler.cppstd=gnu14\n' > "$CONAN_HOME/profiles/$4"
    ;;
  *) echo 'Conan version 2.3.0' ;;
esac"#,
        );
    }

    #[cfg(unix)]
    fn context(root: &Path) -> ProjectContext {
        let mut config = ProjectConfig::default();
        config.conan.home = Some(PathBuf::from(".conan2"));
        config.conan.venv = Some(PathBuf::from(".venv"));
        config.conan.profile = "eurora".to_string();
        ProjectContext::with_config(root.to_path_buf(), config)
    }

    #[cfg(unix)]
    #[test]
    fn test_configure_detects_and_edits_profile() {
        let tmp = TempDir::new().unwrap();
        fake_conan(tmp.path());
        let ctx = context(tmp.path());

        let profile = configure(
            &ctx,
            &Arc::new(Shell::quiet()),
            &ConfigureOptions::default(),
        )
        .unwrap();

        assert_eq!(
            profile,
            tmp.path().join(".conan2").join("profiles").join("eurora")
        );
        let contents = std::fs::read_to_string(&profile).unwrap();
        assert!(contents.contains("compiler.cppstd=17\n"));
        assert!(!contents.contains("gnu14"));
        assert!(contents.contains("\n[options]\n*:shared=True\n"));
        assert_eq!(
            contents.contains("compiler.libcxx=libstdc++11"),
            Platform::current().is_linux()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_configure_wipes_home() {
        let tmp = TempDir::new().unwrap();
        fake_conan(tmp.path());
        let ctx = context(tmp.path());
        let stale = tmp.path().join(".conan2").join("p").join("stale");
        std::fs::create_dir_all(&stale).unwrap();

        let shell = Arc::new(Shell::quiet());
        configure(&ctx, &shell, &ConfigureOptions::default()).unwrap();
        assert!(stale.exists());

        configure(
            &ctx,
            &shell,
            &ConfigureOptions {
                fresh: true,
                ..ConfigureOptions::default()
            },
        )
        .unwrap();
        assert!(!stale.exists());
        assert!(ctx.profile_path("eurora").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_configure_defaults_to_project_home() {
        let tmp = TempDir::new().unwrap();
        fake_conan(tmp.path());
        let mut config = ProjectConfig::default();
        config.conan.venv = Some(PathBuf::from(".venv"));
        let ctx = ProjectContext::with_config(tmp.path().to_path_buf(), config);

        let profile = configure(
            &ctx,
            &Arc::new(Shell::quiet()),
            &ConfigureOptions {
                fresh: true,
                ..ConfigureOptions::default()
            },
        )
        .unwrap();

        assert_eq!(
            profile,
            tmp.path().join(".conan2").join("profiles").join("default")
        );
    }
}
