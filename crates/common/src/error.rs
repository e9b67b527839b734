//! Client-facing error taxonomy shared across crates.

use thiserror::Error;

use crate::validation::{CoreVersion, ValidationError};

/// Every way a request can end in a non-2xx response.
///
/// The `Display` output is the exact `detail` string sent to the caller, so no
/// variant may carry secrets or unsanitised subprocess output. Variants map to
/// HTTP status codes:
/// - [`ServiceError::MissingApiKey`], [`ServiceError::InvalidApiKey`] → 401
/// - [`ServiceError::InvalidJson`], [`ServiceError::Validation`] → 400
/// - [`ServiceError::NotFound`], [`ServiceError::CoreUpdateFailed`] → 404
/// - [`ServiceError::OperationFailed`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing api key")]
    MissingApiKey,

    #[error("invalid api key")]
    InvalidApiKey,

    /// Body could not be decoded: syntax error, wrong type, or over the size cap.
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound,

    /// `detail` must already be stripped of terminal escapes.
    #[error("{}", core_update_failure(.version, .detail))]
    CoreUpdateFailed { version: CoreVersion, detail: String },

    /// Operational failure whose diagnostics stay server-side.
    #[error("{0}")]
    OperationFailed(&'static str),
}

fn core_update_failure(version: &CoreVersion, detail: &str) -> String {
    if detail.is_empty() {
        format!(
            "core-update failed for version {version}. Version may not exist or network error occurred."
        )
    } else {
        format!("core-update failed for version {version}: {detail}")
    }
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::MissingApiKey | ServiceError::InvalidApiKey => 401,
            ServiceError::InvalidJson | ServiceError::Validation(_) => 400,
            ServiceError::NotFound | ServiceError::CoreUpdateFailed { .. } => 404,
            ServiceError::OperationFailed(_) => 500,
        }
    }
}
