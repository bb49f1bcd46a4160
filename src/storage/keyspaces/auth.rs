//! SigV4 SASL authenticator for Keyspaces.
//!
//! The exchange is:
//! 1. client sends the initial token `SigV4\0\0`
//! 2. server challenges with `nonce=<nonce>`
//! 3. client answers `signature=<sig>,access_key=<id>,amzdate=<ts>[,session_token=<tok>]`
//!
//! The signature covers a canonical `PUT /authorization` request whose payload
//! hash is the SHA-256 of the nonce.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::sign::v4::{calculate_signature, generate_signing_key};
use chrono::{DateTime, Utc};
use scylla::authentication::{AuthError, AuthenticatorProvider, AuthenticatorSession};
use sha2::{Digest, Sha256};
use std::time::SystemTime;
use tracing::debug;

use crate::signing::{CredentialScope, KeyspacesNamespace, Namespace, SIGV4_ALGORITHM};

const INITIAL_RESPONSE: &[u8] = b"SigV4\0\0";
const NONCE_KEY: &str = "nonce";
/// Lifetime claimed for the presigned authorization request.
const EXPIRES_SECS: u32 = 900;

/// Hands out a SigV4 authentication session per connection.
pub struct SigV4AuthProvider {
    scope: CredentialScope<KeyspacesNamespace>,
}

impl SigV4AuthProvider {
    pub fn new(scope: CredentialScope<KeyspacesNamespace>) -> Self {
        Self { scope }
    }
}

#[async_trait]
impl AuthenticatorProvider for SigV4AuthProvider {
    async fn start_authentication_session(
        &self,
        authenticator_name: &str,
    ) -> Result<(Option<Vec<u8>>, Box<dyn AuthenticatorSession>), AuthError> {
        debug!(authenticator = %authenticator_name, "Starting SigV4 authentication");
        Ok((
            Some(INITIAL_RESPONSE.to_vec()),
            Box::new(SigV4AuthSession {
                scope: self.scope.clone(),
            }),
        ))
    }
}

struct SigV4AuthSession {
    scope: CredentialScope<KeyspacesNamespace>,
}

#[async_trait]
impl AuthenticatorSession for SigV4AuthSession {
    async fn evaluate_challenge(
        &mut self,
        token: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, AuthError> {
        let challenge = token.ok_or_else(|| "SigV4 challenge is empty".to_string())?;
        let nonce = extract_nonce(challenge)?;
        let credentials = self
            .scope
            .credentials()
            .await
            .map_err(|e| e.to_string())?;

        let response = signed_response(&self.scope, &credentials, &nonce, Utc::now());
        Ok(Some(response.into_bytes()))
    }

    async fn success(&mut self, _token: Option<&[u8]>) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Pull the nonce out of a `k=v,k=v` challenge.
fn extract_nonce(challenge: &[u8]) -> Result<String, AuthError> {
    let text = std::str::from_utf8(challenge)
        .map_err(|e| format!("SigV4 challenge is not UTF-8: {}", e))?;

    text.split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == NONCE_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|nonce| !nonce.is_empty())
        .ok_or_else(|| format!("SigV4 challenge has no nonce: {}", text))
}

/// Build the challenge response for `nonce` at `now`.
fn signed_response(
    scope: &CredentialScope<KeyspacesNamespace>,
    credentials: &Credentials,
    nonce: &str,
    now: DateTime<Utc>,
) -> String {
    let amz_date = now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let credential_scope = scope.scope_for(now);
    let canonical = canonical_request(
        credentials.access_key_id(),
        &credential_scope,
        &amz_date,
        nonce,
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        SIGV4_ALGORITHM,
        amz_date,
        credential_scope,
        sha256_hex(canonical.as_bytes())
    );

    let signing_key = generate_signing_key(
        credentials.secret_access_key(),
        SystemTime::from(now),
        scope.region(),
        KeyspacesNamespace::SERVICE,
    );
    let signature = calculate_signature(signing_key, string_to_sign.as_bytes());

    let mut response = format!(
        "signature={},access_key={},amzdate={}",
        signature,
        credentials.access_key_id(),
        amz_date
    );
    if let Some(token) = credentials.session_token() {
        response.push_str(",session_token=");
        response.push_str(token);
    }
    response
}

fn canonical_request(access_key_id: &str, scope: &str, amz_date: &str, nonce: &str) -> String {
    let mut query = [
        format!("X-Amz-Algorithm={}", SIGV4_ALGORITHM),
        format!("X-Amz-Credential={}%2F{}", access_key_id, uri_encode(scope)),
        format!("X-Amz-Date={}", uri_encode(amz_date)),
        format!("X-Amz-Expires={}", EXPIRES_SECS),
    ];
    query.sort();

    format!(
        "PUT\n/authorization\n{}\nhost:{}\n\nhost\n{}",
        query.join("&"),
        KeyspacesNamespace::SERVICE,
        sha256_hex(nonce.as_bytes())
    )
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
