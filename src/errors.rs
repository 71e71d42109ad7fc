//! Domain error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by buildkit operations.
///
/// Library functions return `anyhow::Result`; these variants travel inside
/// the `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Debug, Error)]
pub enum BuildkitError {
    #[error("{what} not found: {}", location.display())]
    NotFound { what: String, location: PathBuf },

    #[error("`{tool}` not found (searched {searched})")]
    ToolNotFound { tool: String, searched: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unable to parse {tool} version from output: {output:?}")]
    ParseFailure { tool: String, output: String },

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("`{command}` failed with exit code {code:?}\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl BuildkitError {
    /// Shorthand for a missing file or directory.
    pub fn not_found(what: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        BuildkitError::NotFound {
            what: what.into(),
            location: location.into(),
        }
    }

    /// Shorthand for an unparseable `--version` output.
    pub fn parse_failure(tool: impl Into<String>, output: impl Into<String>) -> Self {
        BuildkitError::ParseFailure {
            tool: tool.into(),
            output: output.into(),
        }
    }

    /// Whether this error reports something missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BuildkitError::NotFound { .. } | BuildkitError::ToolNotFound { .. }
        )
    }
}
