//! Ingestion client for the search pipeline.
//!
//! The pipeline's HTTP source only accepts batches, so a single mutation is
//! wrapped in a one-element array before it is posted.

use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::signing::SigningError;

mod http_client;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use http_client::{pipeline_url, HttpIngestionClient, INGESTION_PATH};

/// Errors that prevent a forward from completing.
///
/// A non-2xx answer from the pipeline is not an error; it comes back as a
/// [`SinkResponse`].
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Credentials error: {0}")]
    Credentials(#[from] SigningError),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Batch-shaped body posted to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IngestionEnvelope(Vec<Value>);

impl IngestionEnvelope {
    /// Wrap one record as a batch of one.
    pub fn single(record: Value) -> Self {
        Self(vec![record])
    }

    pub fn records(&self) -> &[Value] {
        &self.0
    }
}

/// Raw answer from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: StatusCode,
    pub body: String,
}

impl SinkResponse {
    /// Only a 200 counts as delivered; other 2xx codes are not acceptance.
    pub fn is_accepted(&self) -> bool {
        self.status == StatusCode::OK
    }
}

/// Destination for mutations that have been written to the store.
#[async_trait]
pub trait IngestionSink: Send + Sync {
    /// Post the envelope once. No retries.
    async fn forward(&self, envelope: &IngestionEnvelope) -> Result<SinkResponse, IngestionError>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}
