//! Request and response bodies exchanged over the public HTTPS API.
//!
//! Every response is a JSON object with exactly one string field: `status` for
//! the health probe, `detail` for everything else.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Core update endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /node/core_update`.
///
/// A missing `core_version` decodes as an empty string so that the validator,
/// not the decoder, reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreUpdateRequest {
    /// Target core version, e.g. `"v1.2.3"`.
    #[serde(default)]
    pub core_version: String,
}

// ---------------------------------------------------------------------------
// Geofiles endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /node/geofiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeofilesRequest {
    /// Region whose data files should be refreshed; matched case-insensitively.
    #[serde(default)]
    pub region: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Body of every response other than the health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailResponse {
    /// Human-readable outcome, safe to expose to callers.
    pub detail: String,
}

impl DetailResponse {
    /// Construct a [`DetailResponse`] from any displayable message.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Response body for `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `"ok"` when the request got past authentication.
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn core_update_request_missing_field_is_empty() {
        let req: CoreUpdateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.core_version, "");
    }

    #[test]
    fn core_update_request_ignores_unknown_fields() {
        let req: CoreUpdateRequest =
            serde_json::from_value(json!({"core_version": "v1.0.0", "force": true})).unwrap();
        assert_eq!(req.core_version, "v1.0.0");
    }

    #[test]
    fn geofiles_request_rejects_non_string_region() {
        let res: Result<GeofilesRequest, _> = serde_json::from_value(json!({"region": 7}));
        assert!(res.is_err());
    }

    #[test]
    fn detail_response_shape() {
        let body = serde_json::to_value(DetailResponse::new("invalid api key")).unwrap();
        assert_eq!(body, json!({"detail": "invalid api key"}));
    }

    #[test]
    fn status_response_shape() {
        let body = serde_json::to_value(StatusResponse::ok()).unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }
}
