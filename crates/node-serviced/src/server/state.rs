//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use crate::exec::CommandRunner;

use super::middleware::COMMAND_TIMEOUT;

/// Application state shared across all request handlers.
///
/// Immutable after startup; every field is `Arc`-backed or `Copy`, so Axum
/// clones it per request without copying data and without locking.
#[derive(Clone)]
pub struct AppState {
    /// Expected value of the `x-api-key` header.
    pub api_key: Arc<str>,
    /// Executable invoked for every maintenance operation.
    pub app_name: Arc<str>,
    pub runner: Arc<dyn CommandRunner>,
    /// Deadline for each command invocation.
    pub command_timeout: Duration,
}

impl AppState {
    /// Create a new [`AppState`] with the default command deadline.
    pub fn new(
        api_key: impl Into<Arc<str>>,
        app_name: impl Into<Arc<str>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            app_name: app_name.into(),
            runner,
            command_timeout: COMMAND_TIMEOUT,
        }
    }
}
