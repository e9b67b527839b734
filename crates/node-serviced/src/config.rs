//! Configuration loading and validation for the node agent.
//!
//! Values come from an env file (loaded into the process environment) and the
//! environment itself. The process exits with a clear error message if any
//! required variable is missing or invalid.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Env file used when `ENV_FILE` is not set.
pub const DEFAULT_ENV_FILE: &str = "/opt/pg-node/.env";

const LOCAL_ENV_FILE_NAME: &str = ".env";

/// Validated agent configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Name (or path) of the maintenance executable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Port the HTTPS server listens on.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Shared secret expected in the `x-api-key` header. **Required.**
    #[serde(default)]
    pub api_key: String,

    /// PEM certificate chain. **Required** unless `no_tls`.
    #[serde(default)]
    pub ssl_cert_file: String,

    /// PEM private key. **Required** unless `no_tls`.
    #[serde(default)]
    pub ssl_key_file: String,

    /// Serve plain HTTP instead of HTTPS.
    #[serde(default)]
    pub no_tls: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_app_name() -> String {
    "pg-node".into()
}
fn default_api_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_name", &self.app_name)
            .field("api_port", &self.api_port)
            .field("api_key", &"[REDACTED]")
            .field("ssl_cert_file", &self.ssl_cert_file)
            .field("ssl_key_file", &self.ssl_key_file)
            .field("no_tls", &self.no_tls)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Which env file was consulted, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSource {
    pub path: PathBuf,
    /// `false` when the path came from `ENV_FILE`.
    pub is_default: bool,
    pub loaded: bool,
}

impl Config {
    /// Resolve and load the env file, then build configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the env file exists but cannot be parsed, or if any
    /// required variable is absent or invalid.
    pub fn load() -> Result<(Self, EnvSource)> {
        let (path, is_default) = resolve_env_file(
            std::env::var_os("ENV_FILE").map(PathBuf::from),
            Path::new(DEFAULT_ENV_FILE),
            std::env::current_exe().ok().as_deref(),
        );

        let loaded = if path.is_file() {
            dotenvy::from_path_override(&path)
                .with_context(|| format!("load env file {}", path.display()))?;
            true
        } else {
            false
        };

        let cfg = Self::from_env()?;
        Ok((
            cfg,
            EnvSource {
                path,
                is_default,
                loaded,
            },
        ))
    }

    /// Build and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(environment())
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("API_KEY must be set in the env file");
        }
        if self.app_name.trim().is_empty() {
            anyhow::bail!("APP_NAME must not be empty");
        }
        if self.no_tls {
            return Ok(());
        }
        if self.ssl_cert_file.is_empty() || self.ssl_key_file.is_empty() {
            anyhow::bail!(
                "TLS required: set SSL_CERT_FILE and SSL_KEY_FILE in the env file, or set NO_TLS=true"
            );
        }
        ensure_exists(&self.ssl_cert_file, "SSL_CERT_FILE")?;
        ensure_exists(&self.ssl_key_file, "SSL_KEY_FILE")?;
        Ok(())
    }
}

/// Blank values (`API_PORT=`) count as unset so serde defaults apply.
fn environment() -> config::Environment {
    config::Environment::default().ignore_empty(true)
}

fn ensure_exists(path: &str, name: &str) -> Result<()> {
    std::fs::metadata(path).with_context(|| format!("cannot read {name}: {path}"))?;
    Ok(())
}

/// Pick the env file: an explicit override wins; otherwise the default, unless
/// it is missing and a `.env` sits next to the executable.
fn resolve_env_file(
    override_path: Option<PathBuf>,
    default_path: &Path,
    exe_path: Option<&Path>,
) -> (PathBuf, bool) {
    if let Some(p) = override_path.filter(|p| !p.as_os_str().is_empty()) {
        return (p, false);
    }

    if !default_path.exists() {
        if let Some(local) = exe_path
            .and_then(Path::parent)
            .map(|dir| dir.join(LOCAL_ENV_FILE_NAME))
            .filter(|p| p.is_file())
        {
            return (local, true);
        }
    }

    (default_path.to_path_buf(), true)
}
