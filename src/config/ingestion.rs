//! Ingestion pipeline configuration.

use serde::Deserialize;

use crate::ingestion::INGESTION_PATH;

/// Ingestion configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Pipeline ingest host (scheme optional, HTTPS assumed).
    pub endpoint: String,
    /// Path of the pipeline's HTTP source.
    pub path: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            path: INGESTION_PATH.to_string(),
            timeout_secs: 30,
        }
    }
}
