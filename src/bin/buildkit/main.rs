//! buildkit CLI - build automation for Conan + CMake C++ projects

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use buildkit::util::Shell;
use cli::{Cli, Commands};
use commands::GlobalOptions;

/// Overrides the default log filter, e.g. `BUILDKIT_LOG=buildkit=trace`.
const LOG_ENV: &str = "BUILDKIT_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("buildkit=debug")
        } else if cli.quiet {
            EnvFilter::new("buildkit=warn")
        } else {
            EnvFilter::new("buildkit=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let global = GlobalOptions {
        shell: Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color)),
        project_dir: cli.project_dir,
        verbose: cli.verbose,
    };

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &global),
        Commands::Configure(args) => commands::configure::execute(args, &global),
        Commands::Env => commands::env::execute(&global),
        Commands::Profile(cmd) => commands::profile::execute(cmd, &global),
        Commands::Descriptor(cmd) => commands::descriptor::execute(cmd, &global),
        Commands::Completions(args) => commands::completions(args),
    }
}
