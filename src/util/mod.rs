//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::ProjectConfig;
pub use context::ProjectContext;
pub use process::{CommandOutput, ProcessBuilder};
pub use shell::Shell;
