//! The maintenance operations exposed over HTTP and how their outcomes map to
//! responses.
//!
//! | operation     | argv                          | on failure                          |
//! |---------------|-------------------------------|-------------------------------------|
//! | `update`      | `update --no-update-service`  | 500, generic detail                 |
//! | `core-update` | `core-update --version <v>`   | 404, detail embeds cleaned stderr   |
//! | `geofiles`    | `geofiles --<region>`         | 500, generic detail                 |
//!
//! Raw stderr never leaves the server except, stripped of terminal escapes, in
//! the `core-update` detail.

use common::{CoreVersion, Region, ServiceError};

use crate::exec::{clean_ansi, ExecError};

/// A validated request to run the maintenance tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Update,
    CoreUpdate(CoreVersion),
    Geofiles(Region),
}

impl Operation {
    /// Subcommand name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Update => "update",
            Operation::CoreUpdate(_) => "core-update",
            Operation::Geofiles(_) => "geofiles",
        }
    }

    /// Arguments passed to the maintenance tool.
    pub fn args(&self) -> Vec<String> {
        match self {
            Operation::Update => vec!["update".into(), "--no-update-service".into()],
            Operation::CoreUpdate(version) => vec![
                "core-update".into(),
                "--version".into(),
                version.as_str().into(),
            ],
            Operation::Geofiles(region) => vec!["geofiles".into(), region.flag()],
        }
    }

    pub fn success_detail(&self) -> &'static str {
        match self {
            Operation::Update => "node updated successfully",
            Operation::CoreUpdate(_) => "node core updated successfully",
            Operation::Geofiles(_) => "geofiles updated successfully",
        }
    }

    /// Client-facing error for a failed run.
    pub fn failure(self, err: &ExecError) -> ServiceError {
        match self {
            Operation::Update => ServiceError::OperationFailed("update failed on server"),
            Operation::CoreUpdate(version) => ServiceError::CoreUpdateFailed {
                version,
                detail: clean_ansi(err.stderr()).trim().to_owned(),
            },
            Operation::Geofiles(_) => {
                ServiceError::OperationFailed("geofiles update failed on server")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(stderr: &str) -> ExecError {
        ExecError::Exited {
            program: "pg-node".into(),
            code: 1,
            stderr: stderr.into(),
        }
    }

    #[test]
    fn argument_templates() {
        assert_eq!(
            Operation::Update.args(),
            vec!["update", "--no-update-service"]
        );
        assert_eq!(
            Operation::CoreUpdate("v1.4.2".parse().unwrap()).args(),
            vec!["core-update", "--version", "v1.4.2"]
        );
        assert_eq!(
            Operation::Geofiles(Region::China).args(),
            vec!["geofiles", "--china"]
        );
    }

    #[test]
    fn update_failure_hides_stderr() {
        let err = Operation::Update.failure(&exited("/srv/secret/path: permission denied"));
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "update failed on server");
    }

    #[test]
    fn geofiles_failure_hides_stderr() {
        let err = Operation::Geofiles(Region::Iran).failure(&exited("mirror unreachable"));
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "geofiles update failed on server");
    }

    #[test]
    fn core_update_failure_embeds_clean_stderr() {
        let err = Operation::CoreUpdate("v2.0.1".parse().unwrap())
            .failure(&exited("\x1b[31mversion not found\x1b[0m\n"));
        assert_eq!(err.http_status(), 404);
        assert_eq!(
            err.to_string(),
            "core-update failed for version v2.0.1: version not found"
        );
    }

    #[test]
    fn core_update_failure_without_stderr_is_generic() {
        let timed_out = ExecError::TimedOut {
            program: "pg-node".into(),
            timeout: std::time::Duration::from_secs(300),
        };
        let err = Operation::CoreUpdate("v2.0.1".parse().unwrap()).failure(&timed_out);
        assert_eq!(err.http_status(), 404);
        assert!(err.to_string().contains("Version may not exist"));
    }
}
