//! Advisory inspection of the serving certificate.
//!
//! Nothing here gates startup: [`super::tls::load_credentials`] decides whether
//! the agent can serve. This module only classifies the certificate and reports
//! its expiry so operators notice a self-signed or soon-to-expire certificate
//! in the logs.

use std::path::Path;

use chrono::{DateTime, SecondsFormat};
use thiserror::Error;
use tracing::{info, warn};
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::time::ASN1Time;

const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum CertError {
    #[error("read cert: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse cert: {0}")]
    Parse(String),
}

/// What startup logs about the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertInfo {
    pub self_signed: bool,
    pub not_after: ASN1Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Expired,
    /// Whole days left, rounded down.
    ValidFor { days: i64 },
}

impl CertInfo {
    pub fn expiry_at(&self, now: ASN1Time) -> Expiry {
        if now > self.not_after {
            Expiry::Expired
        } else {
            Expiry::ValidFor {
                days: (self.not_after.timestamp() - now.timestamp()) / SECS_PER_DAY,
            }
        }
    }

    /// `not_after` as RFC 3339 in UTC, e.g. `2030-01-01T00:00:00Z`.
    pub fn expires_rfc3339(&self) -> String {
        match DateTime::from_timestamp(self.not_after.timestamp(), 0) {
            Some(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => self.not_after.to_string(),
        }
    }
}

/// Read and classify the certificate at `path` (PEM or raw DER).
pub fn inspect_certificate(path: &Path) -> Result<CertInfo, CertError> {
    let data = std::fs::read(path)?;
    inspect_bytes(&data)
}

/// Classify a certificate given as PEM or raw DER.
///
/// Only the first PEM block is considered. A certificate is self-signed when
/// its signature verifies against its own public key *and* its subject equals
/// its issuer.
pub fn inspect_bytes(data: &[u8]) -> Result<CertInfo, CertError> {
    let pem_der = x509_parser::pem::parse_x509_pem(data)
        .ok()
        .map(|(_, pem)| pem.contents);
    let der = pem_der.as_deref().unwrap_or(data);

    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| CertError::Parse(e.to_string()))?;

    let signature_ok = cert.verify_signature(None).is_ok();
    let same_name = cert.subject().to_string() == cert.issuer().to_string();

    Ok(CertInfo {
        self_signed: signature_ok && same_name,
        not_after: cert.validity().not_after,
    })
}

/// Inspect the certificate and log the outcome. Never fails.
pub fn log_certificate_status(path: &Path) {
    let cert = path.display();
    let info = match inspect_certificate(path) {
        Ok(info) => info,
        Err(e) => {
            warn!(%cert, error = %e, "certificate validation failed");
            return;
        }
    };

    if info.self_signed {
        info!(%cert, "certificate is self-signed");
    } else {
        info!(%cert, "certificate appears to be CA-signed");
    }

    let expires = info.expires_rfc3339();
    match info.expiry_at(ASN1Time::now()) {
        Expiry::Expired => {
            warn!(%cert, %expires, "certificate has expired");
        }
        Expiry::ValidFor { days } => {
            info!(%cert, days, %expires, "certificate validity");
        }
    }
}
