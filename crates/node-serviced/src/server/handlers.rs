//! Axum request handlers for all service endpoints.
//!
//! Authentication has already happened in [`super::middleware`] by the time a
//! handler runs. Body-bearing handlers decode (size-capped) and validate before
//! anything is executed.

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{CoreUpdateRequest, DetailResponse, GeofilesRequest, StatusResponse};
use common::{ServiceError, ValidationError};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::middleware::MAX_BODY_BYTES;
use super::operation::Operation;
use super::state::AppState;

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Renders a [`ServiceError`] as `{"detail": ...}` with its status code.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(DetailResponse::new(self.0.to_string()))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Body extraction
// ---------------------------------------------------------------------------

/// JSON body read under [`MAX_BODY_BYTES`].
///
/// Any failure (body too large, truncated, syntax error, wrong types) is
/// reported as [`ServiceError::InvalidJson`].
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| {
                debug!(error = %e, "request body rejected");
                ServiceError::InvalidJson
            })?;

        let value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "request body is not valid JSON");
            ServiceError::InvalidJson
        })?;

        Ok(Self(value))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type DetailResult = Result<Json<DetailResponse>, ApiError>;

/// `GET /`: authenticated liveness probe.
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

/// `POST /node/update`: self-update of the node tool.
pub async fn update(State(state): State<AppState>) -> DetailResult {
    dispatch(&state, Operation::Update).await
}

/// `POST /node/core_update`: install a specific core version.
pub async fn core_update(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CoreUpdateRequest>,
) -> DetailResult {
    let version = req.validate()?;
    dispatch(&state, Operation::CoreUpdate(version)).await
}

/// `POST /node/geofiles`: refresh the data files for one region.
pub async fn geofiles(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GeofilesRequest>,
) -> DetailResult {
    let region = req.validate()?;
    dispatch(&state, Operation::Geofiles(region)).await
}

/// Catch-all 404 handler.
pub async fn not_found() -> ApiError {
    ApiError(ServiceError::NotFound)
}

/// Run the operation and map its outcome. Failures are logged in full here;
/// the client only sees what [`Operation::failure`] allows.
async fn dispatch(state: &AppState, op: Operation) -> DetailResult {
    let args = op.args();
    match state
        .runner
        .run(&state.app_name, &args, state.command_timeout)
        .await
    {
        Ok(()) => {
            info!(operation = op.name(), ?args, "command succeeded");
            Ok(Json(DetailResponse::new(op.success_detail())))
        }
        Err(e) => {
            error!(
                operation = op.name(),
                ?args,
                exit_code = e.exit_code(),
                error = %e,
                stderr = e.stderr(),
                "command failed"
            );
            Err(op.failure(&e).into())
        }
    }
}
