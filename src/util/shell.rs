//! User-facing terminal output.
//!
//! Pipeline progress is reported as right-aligned status lines
//! (`    Building Eurora (Release)`) on stderr. Diagnostics that only matter
//! when debugging go through `tracing` instead.

use std::fmt::{self, Display};
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How much the shell prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// The word shown in the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Finished,
    Updated,
    Removed,
    Cleaning,
    Building,
    Packing,
    Testing,
    Configuring,
    Running,
    Info,
    Skipped,
    Warning,
    Error,
}

/// Color family of a status word.
#[derive(Clone, Copy)]
enum Tone {
    Done,
    Progress,
    Neutral,
    Attention,
    Failure,
}

impl Tone {
    fn ansi(self) -> &'static str {
        match self {
            Tone::Done => "\x1b[1;32m",
            Tone::Progress => "\x1b[1;36m",
            Tone::Neutral => "\x1b[1;34m",
            Tone::Attention => "\x1b[1;33m",
            Tone::Failure => "\x1b[1;31m",
        }
    }
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Updated => "Updated",
            Status::Removed => "Removed",
            Status::Cleaning => "Cleaning",
            Status::Building => "Building",
            Status::Packing => "Packing",
            Status::Testing => "Testing",
            Status::Configuring => "Configuring",
            Status::Running => "Running",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn tone(self) -> Tone {
        use Status::*;
        match self {
            Finished | Updated | Removed => Tone::Done,
            Cleaning | Building | Packing | Testing | Configuring | Running => Tone::Progress,
            Info => Tone::Neutral,
            Skipped | Warning => Tone::Attention,
            Error => Tone::Failure,
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Status line printer shared by the CLI and the build steps.
pub struct Shell {
    verbosity: Verbosity,
    color: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("verbosity", &self.verbosity)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl Shell {
    /// A shell writing to stderr.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        Shell::with_writer(verbosity, color.enabled(), Box::new(io::stderr()))
    }

    /// A shell writing to an arbitrary sink.
    pub fn with_writer(verbosity: Verbosity, color: bool, out: Box<dyn Write + Send>) -> Self {
        Shell {
            verbosity,
            color,
            out: Mutex::new(out),
        }
    }

    /// Map the global `--quiet` / `--verbose` flags. Quiet wins.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };
        Shell::new(verbosity, color)
    }

    /// Errors only, never colored.
    pub fn quiet() -> Self {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print `{status:>12} {message}`. Quiet shells only print errors.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        let line = format!("{} {}\n", self.render(status), msg);
        // Losing a status line is not worth failing the build over.
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(line.as_bytes());
            let _ = out.flush();
        }
    }

    /// Like [`status`](Self::status), but only printed with `--verbose`.
    pub fn verbose(&self, status: Status, msg: impl Display) {
        if self.is_verbose() {
            self.status(status, msg);
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn render(&self, status: Status) -> String {
        let label = format!("{:>width$}", status.label(), width = STATUS_WIDTH);
        if self.color {
            format!("{}{}\x1b[0m", status.tone().ansi(), label)
        } else {
            label
        }
    }

    /// Announce a unit of work now; [`Span::finish`] reports how long it took.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        let message = msg.to_string();
        self.status(status, &message);
        Span {
            shell: Arc::clone(self),
            message,
            start: Instant::now(),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// Work announced on a [`Shell`], timed until [`finish`](Span::finish).
pub struct Span {
    shell: Arc<Shell>,
    message: String,
    start: Instant,
}

impl Span {
    pub fn finish(self) {
        let took = elapsed_label(self.start.elapsed());
        self.shell
            .status(Status::Finished, format!("{} in {}", self.message, took));
    }
}

/// `850ms`, `12.3s`, `2m 05s`.
fn elapsed_label(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{}ms", millis);
    }
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
