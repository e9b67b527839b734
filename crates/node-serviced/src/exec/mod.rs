//! Invocation of the node maintenance tool.
//!
//! Handlers talk to a [`CommandRunner`] rather than to `tokio::process`
//! directly, so route-level failure mapping can be exercised against a mock.
//!
//! # Contract
//!
//! - Standard output is discarded; standard input is closed.
//! - Only standard error is captured, and only on failure is it returned.
//! - Exit codes are reported as-is; no retries, no interpretation.
//! - The call is bounded by a deadline. On expiry, or if the returned future
//!   is dropped, the child is killed.

mod ansi;
mod process;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use ansi::clean_ansi;
pub use process::ProcessRunner;

/// Exit code reported when the program produced no exit status of its own.
pub const GENERIC_EXIT_CODE: i32 = 1;

/// A failed invocation.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program could not be started, or waiting on it failed.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited with a non-zero status.
    #[error("{program} exited with code {code}")]
    Exited {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The program was terminated by a signal.
    #[error("{program} terminated without an exit status")]
    Terminated { program: String, stderr: String },

    /// The deadline elapsed and the program was killed.
    #[error("{program} killed after exceeding {}s deadline", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

impl ExecError {
    /// The program's real exit code, or [`GENERIC_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::Exited { code, .. } => *code,
            _ => GENERIC_EXIT_CODE,
        }
    }

    /// Captured standard error; may contain terminal escape sequences.
    pub fn stderr(&self) -> &str {
        match self {
            ExecError::Exited { stderr, .. } | ExecError::Terminated { stderr, .. } => stderr,
            ExecError::Io { .. } | ExecError::TimedOut { .. } => "",
        }
    }
}

/// Runs an external program to completion under a deadline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> Result<(), ExecError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_is_real_for_exited() {
        let e = ExecError::Exited {
            program: "pg-node".into(),
            code: 42,
            stderr: "boom".into(),
        };
        assert_eq!(e.exit_code(), 42);
        assert_eq!(e.stderr(), "boom");
    }

    #[test]
    fn exit_code_is_generic_otherwise() {
        let spawn = ExecError::Io {
            program: "missing".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let timed_out = ExecError::TimedOut {
            program: "pg-node".into(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(spawn.exit_code(), GENERIC_EXIT_CODE);
        assert_eq!(timed_out.exit_code(), GENERIC_EXIT_CODE);
        assert_eq!(timed_out.stderr(), "");
        assert!(timed_out.to_string().contains("300s"));
    }
}
