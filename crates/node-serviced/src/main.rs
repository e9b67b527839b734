//! `node-serviced`: node maintenance agent entry point.
//!
//! Startup sequence:
//! 1. Resolve and load the env file, then validate [`Config`].
//! 2. Initialise structured logging.
//! 3. Load TLS credentials (fatal on failure) and log certificate diagnostics
//!    (advisory only).
//! 4. Build the Axum router and serve it until the process is killed.

mod config;
mod exec;
mod server;
mod telemetry;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::{Config, EnvSource};
use exec::ProcessRunner;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let (cfg, env_source) = Config::load().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "node-serviced starting");
    log_env_source(&env_source);

    // -----------------------------------------------------------------------
    // 3. TLS
    // -----------------------------------------------------------------------
    let tls = if cfg.no_tls {
        warn!(port = cfg.api_port, "TLS disabled (NO_TLS=true); serving plain HTTP");
        None
    } else {
        let cert_path = Path::new(&cfg.ssl_cert_file);
        let key_path = Path::new(&cfg.ssl_key_file);
        let tls = server::tls::load_credentials(cert_path, key_path)
            .context("failed to load TLS credentials")?;
        server::cert::log_certificate_status(cert_path);
        info!(
            port = cfg.api_port,
            cert = %cert_path.display(),
            key = %key_path.display(),
            "TLS enabled"
        );
        Some(tls)
    };
    info!("API key protection enabled");

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(
        cfg.api_key.as_str(),
        cfg.app_name.as_str(),
        Arc::new(ProcessRunner),
    );
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.api_port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    match tls {
        Some(tls) => {
            info!(url = %format!("https://localhost:{}", cfg.api_port), "listening");
            server::listener::serve_tls(listener, tls, router).await
        }
        None => {
            info!(url = %format!("http://localhost:{}", cfg.api_port), "listening");
            server::listener::serve_plain(listener, router).await
        }
    }
}

fn log_env_source(src: &EnvSource) {
    let path = src.path.display();
    match (src.loaded, src.is_default) {
        (true, _) => info!(env_file = %path, "loaded env file"),
        (false, true) => info!(env_file = %path, "env file not found, using defaults"),
        (false, false) => warn!(env_file = %path, "env file not found"),
    }
}
