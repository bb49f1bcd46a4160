//! SigV4 credential scopes.
//!
//! The store and the ingestion pipeline authenticate against different
//! service namespaces (`cassandra` and `osis`). Each namespace gets its own
//! scope type so a signer built for one can never be handed to the other:
//! `CredentialScope<KeyspacesNamespace>` and `CredentialScope<IngestionNamespace>`
//! are unrelated types.

use std::fmt;
use std::marker::PhantomData;

use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};

/// SigV4 algorithm identifier.
pub const SIGV4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// A SigV4 service namespace.
pub trait Namespace: Send + Sync + 'static {
    /// Service name used in the credential scope.
    const SERVICE: &'static str;
}

/// Amazon Keyspaces (CQL authentication).
#[derive(Debug, Clone, Copy)]
pub struct KeyspacesNamespace;

impl Namespace for KeyspacesNamespace {
    const SERVICE: &'static str = "cassandra";
}

/// OpenSearch Ingestion (HTTP request signing).
#[derive(Debug, Clone, Copy)]
pub struct IngestionNamespace;

impl Namespace for IngestionNamespace {
    const SERVICE: &'static str = "osis";
}

/// Errors resolving signing material.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("No AWS credentials provider configured")]
    MissingProvider,

    #[error("No AWS region configured")]
    MissingRegion,

    #[error("Failed to resolve AWS credentials: {0}")]
    Credentials(#[from] CredentialsError),
}

/// Credentials and region bound to one service namespace.
pub struct CredentialScope<N: Namespace> {
    provider: SharedCredentialsProvider,
    region: String,
    _namespace: PhantomData<fn() -> N>,
}

impl<N: Namespace> CredentialScope<N> {
    pub fn new(provider: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            provider,
            region: region.into(),
            _namespace: PhantomData,
        }
    }

    /// Build from the ambient AWS configuration (env, profile, or role).
    ///
    /// `region_override` wins over the region resolved by the SDK.
    pub fn from_sdk_config(
        config: &aws_config::SdkConfig,
        region_override: Option<&str>,
    ) -> Result<Self, SigningError> {
        let provider = config
            .credentials_provider()
            .ok_or(SigningError::MissingProvider)?;
        let region = region_override
            .map(str::to_owned)
            .or_else(|| config.region().map(|r| r.to_string()))
            .ok_or(SigningError::MissingRegion)?;
        Ok(Self::new(provider, region))
    }

    /// Static credentials, for tests and local tooling.
    pub fn fixed(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        region: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            "catalog-sync-static",
        );
        Self::new(SharedCredentialsProvider::new(credentials), region)
    }

    pub fn service(&self) -> &'static str {
        N::SERVICE
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Resolve the current credentials (refreshed by the provider as needed).
    pub async fn credentials(&self) -> Result<Credentials, SigningError> {
        Ok(self.provider.provide_credentials().await?)
    }

    /// `<yyyymmdd>/<region>/<service>/aws4_request`
    pub fn scope_for(&self, time: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            time.format("%Y%m%d"),
            self.region,
            N::SERVICE
        )
    }
}

impl<N: Namespace> Clone for CredentialScope<N> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            region: self.region.clone(),
            _namespace: PhantomData,
        }
    }
}

impl<N: Namespace> fmt::Debug for CredentialScope<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialScope")
            .field("service", &N::SERVICE)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scopes_use_distinct_services() {
        let store = CredentialScope::<KeyspacesNamespace>::fixed("AK", "SK", None, "us-east-1");
        let sink = CredentialScope::<IngestionNamespace>::fixed("AK", "SK", None, "us-east-1");
        assert_eq!(store.service(), "cassandra");
        assert_eq!(sink.service(), "osis");
    }

    #[test]
    fn test_scope_string() {
        let scope = CredentialScope::<KeyspacesNamespace>::fixed("AK", "SK", None, "eu-west-1");
        let time = Utc.with_ymd_and_hms(2024, 12, 24, 23, 59, 0).unwrap();
        assert_eq!(scope.scope_for(time), "20241224/eu-west-1/cassandra/aws4_request");
    }

    #[tokio::test]
    async fn test_fixed_credentials_resolve() {
        let scope = CredentialScope::<IngestionNamespace>::fixed(
            "AKIDEXAMPLE",
            "secret",
            Some("token".to_string()),
            "us-west-2",
        );
        let creds = scope.credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(creds.secret_access_key(), "secret");
        assert_eq!(creds.session_token(), Some("token"));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let scope = CredentialScope::<IngestionNamespace>::fixed("AK", "topsecret", None, "us-east-1");
        let rendered = format!("{:?}", scope);
        assert!(rendered.contains("osis"));
        assert!(!rendered.contains("topsecret"));
    }
}
