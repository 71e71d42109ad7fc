//! `buildkit profile` commands

use std::path::PathBuf;

use anyhow::Result;

use super::GlobalOptions;
use crate::cli::{ProfileCommand, ProfileTarget};
use buildkit::errors::BuildkitError;
use buildkit::profile::{read_profile_value, update_profile};
use buildkit::util::shell::Status;

pub fn execute(cmd: ProfileCommand, global: &GlobalOptions) -> Result<()> {
    match cmd {
        ProfileCommand::Set(args) => {
            let path = resolve_profile(&args.target, global)?;
            update_profile(&path, &args.section, &args.key, args.value.as_deref())?;
            global.shell.status(
                Status::Updated,
                format!("[{}] {} in {}", args.section, args.key, path.display()),
            );
        }
        ProfileCommand::Get(args) => {
            let path = resolve_profile(&args.target, global)?;
            match read_profile_value(&path, &args.section, &args.key)? {
                Some(value) => println!("{}", value),
                None => {
                    return Err(BuildkitError::not_found(
                        format!("[{}] {}", args.section, args.key),
                        path,
                    )
                    .into())
                }
            }
        }
    }
    Ok(())
}

/// An explicit `--path` wins; otherwise the named (or configured) profile
/// inside the project's Conan home.
fn resolve_profile(target: &ProfileTarget, global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(path) = &target.path {
        return Ok(path.clone());
    }
    let ctx = global.project()?;
    let name = target
        .profile
        .clone()
        .unwrap_or_else(|| ctx.config().conan.profile.clone());
    Ok(ctx.profile_path(&name))
}
