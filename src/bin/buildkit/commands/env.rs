//! `buildkit env` command
//!
//! Prints what the build steps would discover. Missing tools are reported,
//! not treated as failures.

use anyhow::Result;

use super::GlobalOptions;
use buildkit::builder::{BuildConfig, Workflow};
use buildkit::ops::{format_report, inspect};

pub fn execute(global: &GlobalOptions) -> Result<()> {
    let ctx = global.project()?;
    let config = BuildConfig::new(&ctx, Workflow::default());

    let report = inspect(&config);
    print!("{}", format_report(&report));

    if !report.all_found() {
        global
            .shell
            .warn("some tools were not found; run `buildkit configure` to set them up");
    }
    Ok(())
}
