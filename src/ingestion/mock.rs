//! Recording sink for testing.

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::RwLock;

use super::{IngestionEnvelope, IngestionError, IngestionSink, SinkResponse};

/// Records every forwarded envelope and answers with a configurable status.
pub struct MockIngestionSink {
    forwarded: RwLock<Vec<IngestionEnvelope>>,
    status: RwLock<StatusCode>,
    fail_transport: RwLock<bool>,
}

impl Default for MockIngestionSink {
    fn default() -> Self {
        Self {
            forwarded: RwLock::new(Vec::new()),
            status: RwLock::new(StatusCode::OK),
            fail_transport: RwLock::new(false),
        }
    }
}

impl MockIngestionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned by subsequent forwards.
    pub async fn set_status(&self, status: StatusCode) {
        *self.status.write().await = status;
    }

    /// Make subsequent forwards fail before reaching the pipeline.
    pub async fn set_fail_transport(&self, fail: bool) {
        *self.fail_transport.write().await = fail;
    }

    pub async fn forwarded(&self) -> Vec<IngestionEnvelope> {
        self.forwarded.read().await.clone()
    }

    pub async fn forward_count(&self) -> usize {
        self.forwarded.read().await.len()
    }
}

#[async_trait]
impl IngestionSink for MockIngestionSink {
    async fn forward(&self, envelope: &IngestionEnvelope) -> Result<SinkResponse, IngestionError> {
        self.forwarded.write().await.push(envelope.clone());

        if *self.fail_transport.read().await {
            return Err(IngestionError::Unavailable(
                "injected transport failure".to_string(),
            ));
        }

        let status = *self.status.read().await;
        Ok(SinkResponse {
            status,
            body: format!("{{\"status\":{}}}", status.as_u16()),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
