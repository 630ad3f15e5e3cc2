//! Build collaborators invoked by the rebuild cycle.
//!
//! The cycle knows two external steps: a [`Bundler`] that produces the build
//! output and a [`TypeChecker`] whose diagnostics are advisory. Both are
//! synchronous; the coordinator runs them on the blocking thread pool.

mod command;

use std::process::ExitStatus;

pub use command::{CommandBundler, CommandChecker, SkipChecker};

/// Produces the distributable output from source.
pub trait Bundler: Send + Sync {
    /// Run one bundle pass.
    fn bundle(&self) -> Result<(), PipelineError>;
}

/// Runs a static check over the source tree.
///
/// The outcome never gates serving or reloading.
pub trait TypeChecker: Send + Sync {
    /// Run one check pass and return its diagnostics.
    fn check(&self) -> Result<CheckReport, PipelineError>;
}

/// Diagnostics produced by a [`TypeChecker`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Whether the check found no problems.
    pub passed: bool,
    /// Diagnostic output, printed to the console as-is.
    pub output: String,
}

impl CheckReport {
    /// A passing report without output.
    #[must_use]
    pub fn passed() -> Self {
        Self {
            passed: true,
            output: String::new(),
        }
    }
}

/// Error from a build collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The command could not be started.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The command ran and reported failure.
    #[error("`{program}` failed ({status}){}", format_stderr(.stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    /// The step panicked or was cancelled on the blocking pool.
    #[error("{step} did not complete: {message}")]
    Aborted { step: &'static str, message: String },
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}
