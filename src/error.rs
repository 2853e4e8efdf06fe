use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Unified error type for git-semver operations
#[derive(Error, Debug)]
pub enum GitSemverError {
    #[error("{} is not inside a git repository", .path.display())]
    NotARepository { path: PathBuf },

    #[error(transparent)]
    GitExec(#[from] GitExecError),

    #[error("Git operation failed: {0}")]
    Git2(#[from] git2::Error),

    #[error("git executable not found: {0}")]
    GitNotFound(String),

    #[error("{0:?} is not a valid Go identifier")]
    InvalidIdentifier(String),

    #[error("cannot increment the patch level of {0:?}")]
    InvalidTag(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-semver
pub type Result<T> = std::result::Result<T, GitSemverError>;

impl GitSemverError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitSemverError::Config(msg.into())
    }

    /// The OS error code behind this error, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            GitSemverError::GitExec(e) => e.raw_os_error(),
            GitSemverError::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

/// Why an external git invocation failed.
#[derive(Debug)]
pub enum ExecCause {
    /// The process could not be spawned or waited on.
    Spawn(std::io::Error),
    /// The process ran but exited unsuccessfully.
    Status(ExitStatus),
}

impl fmt::Display for ExecCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecCause::Spawn(e) => write!(f, "{}", e),
            ExecCause::Status(status) => write!(f, "{}", status),
        }
    }
}

/// A failed git command, with everything needed to reproduce it.
#[derive(Debug)]
pub struct GitExecError {
    pub program: String,
    pub args: Vec<String>,
    pub cause: Option<ExecCause>,
    pub stderr: String,
}

impl GitExecError {
    pub fn new(
        program: impl Into<String>,
        args: &[&str],
        cause: Option<ExecCause>,
        stderr: impl Into<String>,
    ) -> Self {
        GitExecError {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            cause,
            stderr: stderr.into(),
        }
    }

    /// The command line as a single string, e.g. `git -C . tag`.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        match &self.cause {
            Some(ExecCause::Spawn(e)) => e.raw_os_error(),
            _ => None,
        }
    }
}

impl fmt::Display for GitExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:", self.command_line())?;
        if let Some(cause) = &self.cause {
            write!(f, " {}", cause)?;
        }
        if !self.stderr.is_empty() {
            write!(f, " {:?}", self.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for GitExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(ExecCause::Spawn(e)) => Some(e),
            _ => None,
        }
    }
}
