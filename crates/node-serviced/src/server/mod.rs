//! Axum HTTPS server, routing, and middleware.
//!
//! # Responsibilities
//! - Load TLS credentials and report on the serving certificate.
//! - Define the Axum router with all routes and shared middleware.
//! - Map maintenance operations to command lines and their outcomes to responses.
//! - Inject shared application state (`AppState`) into handlers.

pub mod cert;
pub mod handlers;
pub mod listener;
pub mod middleware;
pub mod operation;
pub mod router;
pub mod state;
pub mod tls;
