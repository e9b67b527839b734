//! TLS listener setup using rustls.
//!
//! The certificate and key paths come from `SSL_CERT_FILE` / `SSL_KEY_FILE`.
//! Any failure here is fatal: the agent never serves without a valid key pair
//! unless TLS was explicitly disabled.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::ServerConfig;

/// Load a PEM certificate chain and private key from disk into a server config.
///
/// # Errors
///
/// Returns an error if either file cannot be read, does not contain PEM data
/// of the expected kind, or if the key does not belong to the certificate.
pub fn load_credentials(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let cert_pem = std::fs::read(cert_path)
        .with_context(|| format!("failed to read certificate {}", cert_path.display()))?;
    let key_pem = std::fs::read(key_path)
        .with_context(|| format!("failed to read private key {}", key_path.display()))?;
    build_server_config(&cert_pem, &key_pem)
}

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// Clients are not asked for certificates.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificate found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{generate_simple_self_signed, KeyPair};
    use tempfile::TempDir;

    #[test]
    fn rejects_empty_cert_pem() {
        let result = build_server_config(b"", b"");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        let result = build_server_config(b"not a pem", b"also not a pem");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_matching_pair() {
        let ck = generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let cfg = build_server_config(
            ck.cert.pem().as_bytes(),
            ck.key_pair.serialize_pem().as_bytes(),
        )
        .unwrap();
        assert!(cfg.alpn_protocols.contains(&b"http/1.1".to_vec()));
    }

    #[test]
    fn rejects_key_from_another_pair() {
        let ck = generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let other = KeyPair::generate().unwrap();
        let result = build_server_config(
            ck.cert.pem().as_bytes(),
            other.serialize_pem().as_bytes(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_credentials_from_files() {
        let ck = generate_simple_self_signed(vec!["localhost".into()]).unwrap();
        let dir = TempDir::new().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, ck.cert.pem()).unwrap();
        std::fs::write(&key, ck.key_pair.serialize_pem()).unwrap();

        assert!(load_credentials(&cert, &key).is_ok());
    }

    #[test]
    fn load_credentials_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_credentials(&dir.path().join("cert.pem"), &dir.path().join("key.pem"))
            .unwrap_err();
        assert!(err.to_string().contains("certificate"));
    }
}
