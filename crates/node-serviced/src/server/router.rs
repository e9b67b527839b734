//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/node/update", post(handlers::update))
        .route("/node/core_update", post(handlers::core_update))
        .route("/node/geofiles", post(handlers::geofiles))
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
