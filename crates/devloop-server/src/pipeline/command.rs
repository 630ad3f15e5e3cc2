//! Collaborators backed by external commands.

use std::path::PathBuf;
use std::process::{Command, Output};

use super::{Bundler, CheckReport, PipelineError, TypeChecker};

/// Program, arguments, and working directory of an external step.
#[derive(Clone, Debug)]
struct ProcessSpec {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl ProcessSpec {
    fn new(argv: Vec<String>, cwd: PathBuf) -> Self {
        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_default();
        Self {
            program,
            args: argv.collect(),
            cwd,
        }
    }

    /// Run to completion with stdout and stderr captured.
    fn output(&self) -> Result<Output, PipelineError> {
        tracing::debug!(program = %self.program, args = ?self.args, cwd = %self.cwd.display(), "Running command");
        Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .output()
            .map_err(|source| PipelineError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

/// Bundler that runs an external command, e.g. `deno run -A bundle.ts`.
#[derive(Clone, Debug)]
pub struct CommandBundler {
    spec: ProcessSpec,
}

impl CommandBundler {
    /// Create a bundler running `argv` inside `cwd`.
    #[must_use]
    pub fn new(argv: Vec<String>, cwd: PathBuf) -> Self {
        Self {
            spec: ProcessSpec::new(argv, cwd),
        }
    }
}

impl Bundler for CommandBundler {
    fn bundle(&self) -> Result<(), PipelineError> {
        let output = self.spec.output()?;
        if !output.status.success() {
            return Err(PipelineError::Failed {
                program: self.spec.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Bundle succeeded"
        );
        Ok(())
    }
}

/// Type-checker that runs an external command, e.g. `deno check src`.
///
/// A non-zero exit is a failed check, not an error: the diagnostics are in
/// the report.
#[derive(Clone, Debug)]
pub struct CommandChecker {
    spec: ProcessSpec,
}

impl CommandChecker {
    /// Create a checker running `argv` inside `cwd`.
    #[must_use]
    pub fn new(argv: Vec<String>, cwd: PathBuf) -> Self {
        Self {
            spec: ProcessSpec::new(argv, cwd),
        }
    }
}

impl TypeChecker for CommandChecker {
    fn check(&self) -> Result<CheckReport, PipelineError> {
        let output = self.spec.output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CheckReport {
            passed: output.status.success(),
            output: text,
        })
    }
}

/// Checker used when the check step is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipChecker;

impl TypeChecker for SkipChecker {
    fn check(&self) -> Result<CheckReport, PipelineError> {
        Ok(CheckReport::passed())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()]
    }

    fn cwd() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn test_bundler_success() {
        let bundler = CommandBundler::new(sh("exit 0"), cwd());
        assert!(bundler.bundle().is_ok());
    }

    #[test]
    fn test_bundler_failure_carries_stderr() {
        let bundler = CommandBundler::new(sh("echo 'syntax error' >&2; exit 3"), cwd());

        let err = bundler.bundle().unwrap_err();

        assert!(matches!(err, PipelineError::Failed { .. }));
        let msg = err.to_string();
        assert!(msg.contains("`sh` failed"), "got: {msg}");
        assert!(msg.contains("syntax error"), "got: {msg}");
    }

    #[test]
    fn test_bundler_missing_program() {
        let bundler = CommandBundler::new(
            vec!["devloop-definitely-not-a-program".to_owned()],
            cwd(),
        );

        let err = bundler.bundle().unwrap_err();

        assert!(matches!(err, PipelineError::Spawn { .. }));
        assert!(err.to_string().contains("devloop-definitely-not-a-program"));
    }

    #[test]
    fn test_bundler_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = CommandBundler::new(sh("mkdir dist && touch dist/app.js"), dir.path().to_path_buf());

        bundler.bundle().unwrap();

        assert!(dir.path().join("dist/app.js").exists());
    }

    #[test]
    fn test_checker_collects_output() {
        let checker = CommandChecker::new(sh("echo 'Check src/main.ts'"), cwd());

        let report = checker.check().unwrap();

        assert!(report.passed);
        assert_eq!(report.output, "Check src/main.ts\n");
    }

    #[test]
    fn test_checker_failure_is_a_report() {
        let checker = CommandChecker::new(
            sh("echo 'Check src/main.ts'; echo 'TS2322 [ERROR]' >&2; exit 1"),
            cwd(),
        );

        let report = checker.check().unwrap();

        assert!(!report.passed);
        assert!(report.output.contains("Check src/main.ts"));
        assert!(report.output.contains("TS2322"));
    }

    #[test]
    fn test_skip_checker_passes() {
        assert_eq!(SkipChecker.check().unwrap(), CheckReport::passed());
    }
}
