//! Axum middleware and request-level limits.
//!
//! Every route sits behind [`require_api_key`], including unknown paths.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use common::ServiceError;
use tracing::warn;

use super::handlers::ApiError;
use super::state::AppState;

/// Deadline for one invocation of the maintenance tool.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Largest request body accepted by the JSON endpoints (1 MiB).
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Time a client has to finish sending request headers.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A connection with no traffic for this long is closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(120);

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject the request with 401 unless `x-api-key` matches the configured key.
///
/// Denials are logged with method, path and reason. Key values are never logged.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match check_api_key(request.headers().get(API_KEY_HEADER), &state.api_key) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(
                method = %request.method(),
                path = request.uri().path(),
                reason = %e,
                "unauthorized request"
            );
            ApiError::from(e).into_response()
        }
    }
}

fn check_api_key(header: Option<&HeaderValue>, expected: &str) -> Result<(), ServiceError> {
    match header.map(HeaderValue::as_bytes) {
        None | Some([]) => Err(ServiceError::MissingApiKey),
        Some(submitted) if submitted == expected.as_bytes() => Ok(()),
        Some(_) => Err(ServiceError::InvalidApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_empty_header_is_missing() {
        assert!(matches!(
            check_api_key(None, "secret"),
            Err(ServiceError::MissingApiKey)
        ));
        let empty = HeaderValue::from_static("");
        assert!(matches!(
            check_api_key(Some(&empty), "secret"),
            Err(ServiceError::MissingApiKey)
        ));
    }

    #[test]
    fn wrong_key_is_invalid() {
        let wrong = HeaderValue::from_static("secret2");
        assert!(matches!(
            check_api_key(Some(&wrong), "secret"),
            Err(ServiceError::InvalidApiKey)
        ));
    }

    #[test]
    fn matching_key_passes() {
        let ok = HeaderValue::from_static("secret");
        assert!(check_api_key(Some(&ok), "secret").is_ok());
    }

    #[test]
    fn limits() {
        assert_eq!(MAX_BODY_BYTES, 1_048_576);
        assert_eq!(COMMAND_TIMEOUT, Duration::from_secs(300));
        assert_eq!(HEADER_READ_TIMEOUT, Duration::from_secs(10));
        assert_eq!(IDLE_TIMEOUT, Duration::from_secs(120));
    }
}
