//! Command runner port for launching external programs.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::error::ToolError;

/// Boxed future type alias used by [`CommandRunner`] to keep the trait dyn-compatible.
pub type CommandFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, ToolError>> + Send + 'a>>;

/// A fully described program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The executable to run.
    pub program: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory; the runner's own directory when `None`.
    pub workdir: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), workdir: None, env: Vec::new() }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// The output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code of the process.
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

/// Runs external programs.
///
/// Dropping the returned future must abandon the child process, which is how
/// per-call timeouts and scan cancellation stop a hung tool.
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation to completion and captures its output.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`], not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Spawn`] if the program cannot be started and
    /// [`ToolError::Terminated`] if it was killed by a signal.
    fn run<'a>(&'a self, invocation: &'a Invocation) -> CommandFuture<'a>;
}
