//! `buildkit build` command

use std::sync::Arc;

use anyhow::Result;

use super::GlobalOptions;
use crate::cli::BuildArgs;
use buildkit::builder::{BuildConfig, Builder, Workflow};

pub fn execute(args: BuildArgs, global: &GlobalOptions) -> Result<()> {
    let workflow = Workflow {
        clean: args.clean,
        build: args.build,
        pack: args.pack,
        test: args.test,
        debug: args.debug,
        verbose: global.verbose,
    };

    if !workflow.any_step() {
        global
            .shell
            .note("no workflow step selected; pass --clean, --build, --pack or --test");
        return Ok(());
    }

    let ctx = global.project()?;
    let config = BuildConfig::new(&ctx, workflow);
    tracing::debug!("build configuration: {:?}", config);

    let mut builder = Builder::new(Arc::clone(&global.shell));
    builder.setup_and_run(config)
}
