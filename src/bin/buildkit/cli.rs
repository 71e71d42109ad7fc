//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use buildkit::util::shell::ColorChoice;

/// buildkit - build automation for Conan + CMake C++ projects
#[derive(Parser)]
#[command(name = "buildkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (also makes conan verbose during `build`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// When to color status output
    #[arg(long, global = true, value_name = "WHEN", value_enum, default_value = "auto")]
    pub color: ColorChoice,

    /// Project directory (defaults to searching upward from the current directory)
    #[arg(long, global = true, value_name = "DIR", env = "BUILDKIT_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean, build, package and test the project
    Build(BuildArgs),

    /// Set up the Conan home and profile
    Configure(ConfigureArgs),

    /// Show the discovered virtual environment and tools
    Env,

    /// Read or edit a Conan profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Edit the project descriptor (conanfile.py)
    #[command(subcommand)]
    Descriptor(DescriptorCommand),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Clean the build tree of the selected build type
    #[arg(long)]
    pub clean: bool,

    /// Install dependencies and build with Conan
    #[arg(long)]
    pub build: bool,

    /// Install artifacts into the dist directory
    #[arg(long)]
    pub pack: bool,

    /// Run tests with ctest
    #[arg(long)]
    pub test: bool,

    /// Use the Debug build type instead of Release
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args)]
pub struct ConfigureArgs {
    /// Delete and recreate the Conan home
    #[arg(long)]
    pub fresh: bool,

    /// Install conan into the pipenv environment first
    #[arg(long)]
    pub install_conan: bool,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Set a key in a profile section
    Set(ProfileSetArgs),

    /// Print a key from a profile section
    Get(ProfileGetArgs),
}

#[derive(Args)]
pub struct ProfileTarget {
    /// Profile name inside the Conan home (defaults to the configured profile)
    #[arg(long, conflicts_with = "path")]
    pub profile: Option<String>,

    /// Explicit profile file
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProfileSetArgs {
    /// Section name, without brackets
    pub section: String,

    /// Key to set
    pub key: String,

    /// Value; omit to write a bare key
    pub value: Option<String>,

    #[command(flatten)]
    pub target: ProfileTarget,
}

#[derive(Args)]
pub struct ProfileGetArgs {
    /// Section name, without brackets
    pub section: String,

    /// Key to read
    pub key: String,

    #[command(flatten)]
    pub target: ProfileTarget,
}

#[derive(Subcommand)]
pub enum DescriptorCommand {
    /// Replace the value of an existing attribute
    Set(DescriptorSetArgs),
}

#[derive(Args)]
pub struct DescriptorSetArgs {
    /// Attribute name, e.g. `name` or `version`
    pub attribute: String,

    /// New value, written as a Python string literal
    pub value: String,

    /// Descriptor to edit (defaults to the project's conanfile.py)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Write the result here instead of editing in place
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
