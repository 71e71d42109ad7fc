//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

use crate::errors::BuildkitError;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Builder for subprocess execution.
///
/// Arguments are kept as individual tokens and handed to the OS unchanged,
/// unless [`shell`](ProcessBuilder::shell) mode asks for the quoted command
/// line to be interpreted by `sh -c` (`cmd /C` on Windows).
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    shell: bool,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            shell: false,
        }
    }

    /// Create a process builder from a command line such as
    /// `conan install . --build=missing`.
    ///
    /// See [`split_command_line`] for the quoting rules.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut tokens = split_command_line(line)?.into_iter();
        let program = tokens.next().ok_or_else(|| {
            BuildkitError::InvalidArgument("command line is empty".to_string())
        })?;
        Ok(ProcessBuilder::new(program).args(tokens))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Run through the platform shell, so operators, globs and `$VAR`
    /// references in unquoted tokens are expanded.
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment override.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    fn build_command(&self) -> Command {
        let mut cmd = if !self.shell {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            cmd
        } else if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(self.display_command());
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(self.display_command());
            cmd
        };

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute with captured output.
    ///
    /// With `check` set, a non-zero exit becomes a
    /// [`BuildkitError::CommandFailed`]; otherwise the failing status is
    /// returned to the caller.
    pub fn run(&self, check: bool) -> Result<CommandOutput> {
        tracing::debug!("running `{}`", self.display_command());

        let output = self
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let output = CommandOutput::from_output(output);
        if check && !output.success() {
            return Err(BuildkitError::CommandFailed {
                command: self.display_command(),
                code: output.code,
                stderr: output.stderr.trim_end().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<CommandOutput> {
        self.run(true)
    }

    /// Execute with stdio inherited from the current process and return the
    /// exit code.
    pub fn stream(&self, check: bool) -> Result<Option<i32>> {
        tracing::debug!("running `{}`", self.display_command());

        let status = self
            .build_command()
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;

        if check && !status.success() {
            return Err(BuildkitError::CommandFailed {
                command: self.display_command(),
                code: status.code(),
                stderr: String::new(),
            }
            .into());
        }
        Ok(status.code())
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![quote_token(&self.program.display().to_string())];
        parts.extend(self.args.iter().map(|a| quote_token(a)));
        parts.join(" ")
    }
}

fn quote_token(token: &str) -> String {
    if token.is_empty() {
        "''".to_string()
    } else if token.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("'{}'", token.replace('\'', r"'\''"))
    } else {
        token.to_string()
    }
}

/// Split a command line into argument tokens.
///
/// Whitespace separates tokens. Single quotes group text literally, double
/// quotes group text and honour `\"` and `\\`, and a backslash outside quotes
/// escapes the next character. Unterminated quotes are rejected.
pub fn split_command_line(line: &str) -> Result<Vec<String>> {
    #[derive(PartialEq)]
    enum State {
        Normal,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut state = State::Normal;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                '\'' => {
                    state = State::Single;
                    in_token = true;
                }
                '"' => {
                    state = State::Double;
                    in_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    in_token = true;
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
            State::Single => match c {
                '\'' => state = State::Normal,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Normal,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => current.push('\\'),
                },
                c => current.push(c),
            },
        }
    }

    if state != State::Normal {
        return Err(BuildkitError::InvalidArgument(format!(
            "unterminated quote in command line: {}",
            line
        ))
        .into());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Whether `path` is a file the current user could execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "exe" | "bat" | "cmd"))
            .unwrap_or(false)
    }
}

/// Write a small executable shell script, for tests that need fake tools.
#[cfg(all(test, unix))]
pub(crate) fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
