//! Structured logging for the agent.
//!
//! # Telemetry invariants
//!
//! - **No key material**: the API key never appears in any log field, neither
//!   the configured value nor a submitted one.
//! - Subprocess stderr is logged in full; it is the only place it is kept.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
