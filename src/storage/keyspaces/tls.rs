//! TLS trust anchor for Keyspaces connections.
//!
//! The service certificate chains to the Starfield Class 2 root. The root is
//! downloaded once into a cache directory and read from there afterwards.
//!
//! The CQL driver hands rustls the node's IP address as the server name, while
//! the service certificate only names `cassandra.<region>.amazonaws.com`.
//! [`ContactPointVerifier`] therefore checks the chain against the pinned root
//! and the name against the configured contact-point host instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, info, warn};

pub use crate::config::DEFAULT_CERT_URL;
use crate::storage::{Result, StoreError};

/// Cached file name of the root certificate.
pub const DEFAULT_CERT_FILE: &str = "sf-class2-root.crt";

/// Return the cached root certificate path, downloading it when absent or unusable.
///
/// A download is parsed before it is cached and lands under its final name by
/// rename, so a truncated or non-PEM response never poisons the cache.
pub async fn ensure_root_certificate(dir: &Path, url: &str) -> Result<PathBuf> {
    let path = dir.join(DEFAULT_CERT_FILE);
    if tokio::fs::try_exists(&path).await? {
        let cached = tokio::fs::read(&path).await?;
        match parse_certificates(&cached) {
            Ok(_) => {
                debug!(path = %path.display(), "Using cached root certificate");
                return Ok(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Cached root certificate unusable"),
        }
    }

    info!(url = %url, path = %path.display(), "Downloading root certificate");
    let pem = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| StoreError::Certificate(format!("download from {} failed: {}", url, e)))?
        .bytes()
        .await
        .map_err(|e| StoreError::Certificate(format!("reading {} failed: {}", url, e)))?;

    parse_certificates(&pem).map_err(|e| {
        StoreError::Certificate(format!("{} did not return a usable certificate: {}", url, e))
    })?;

    tokio::fs::create_dir_all(dir).await?;
    let staging = dir.join(format!("{}.{}.tmp", DEFAULT_CERT_FILE, std::process::id()));
    tokio::fs::write(&staging, &pem).await?;
    if let Err(e) = tokio::fs::rename(&staging, &path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(path)
}

/// Client TLS config that trusts only the certificates in `cert_path` and
/// expects the server certificate to name `server_name`.
pub fn tls_client_config(cert_path: &Path, server_name: &str) -> Result<Arc<ClientConfig>> {
    let pem = std::fs::read(cert_path)?;

    let mut roots = RootCertStore::empty();
    for cert in parse_certificates(&pem)
        .map_err(|e| StoreError::Certificate(format!("{}: {}", cert_path.display(), e)))?
    {
        roots
            .add(cert)
            .map_err(|e| StoreError::Certificate(e.to_string()))?;
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = ContactPointVerifier::new(roots, provider.clone(), server_name)?;

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| StoreError::Certificate(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    Ok(Arc::new(config))
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut &pem[..]).collect::<std::io::Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(StoreError::Certificate("no certificates found".to_string()));
    }
    Ok(certs)
}

/// WebPKI chain verification with the name pinned to the contact point.
#[derive(Debug)]
struct ContactPointVerifier {
    inner: Arc<WebPkiServerVerifier>,
    server_name: ServerName<'static>,
}

impl ContactPointVerifier {
    fn new(
        roots: RootCertStore,
        provider: Arc<rustls::crypto::CryptoProvider>,
        server_name: &str,
    ) -> Result<Self> {
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| StoreError::Certificate(e.to_string()))?;
        let server_name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            StoreError::Certificate(format!("invalid contact point {:?}: {}", server_name, e))
        })?;
        Ok(Self { inner, server_name })
    }
}

impl ServerCertVerifier for ContactPointVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.inner.verify_server_cert(
            end_entity,
            intermediates,
            &self.server_name,
            ocsp_response,
            now,
        )
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
