//! Command implementations

pub mod build;
pub mod configure;
pub mod descriptor;
pub mod env;
pub mod profile;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;

use buildkit::errors::BuildkitError;
use buildkit::util::{ProjectContext, Shell};

use crate::cli::{Cli, CompletionsArgs};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    pub project_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl GlobalOptions {
    /// Open the project named by `--project-dir`, or discover it upward
    /// from the current directory.
    pub fn project(&self) -> Result<ProjectContext> {
        match &self.project_dir {
            Some(dir) if !dir.is_dir() => {
                Err(BuildkitError::not_found("project directory", dir).into())
            }
            Some(dir) => ProjectContext::at(dir.clone()),
            None => ProjectContext::discover(),
        }
    }
}

/// `buildkit completions`: print a completion script to stdout.
pub fn completions(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout().lock())
}

fn write_completions(shell: clap_complete::Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, env!("CARGO_BIN_NAME"), out);
    out.flush()?;
    Ok(())
}
