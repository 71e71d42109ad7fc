//! `buildkit configure` command

use anyhow::Result;

use super::GlobalOptions;
use crate::cli::ConfigureArgs;
use buildkit::ops::{configure, ConfigureOptions};

pub fn execute(args: ConfigureArgs, global: &GlobalOptions) -> Result<()> {
    let ctx = global.project()?;
    let opts = ConfigureOptions {
        fresh: args.fresh,
        install_conan: args.install_conan,
    };
    configure(&ctx, &global.shell, &opts)?;
    Ok(())
}
