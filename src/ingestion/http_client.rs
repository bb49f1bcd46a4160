//! SigV4-signed HTTP client for OpenSearch Ingestion.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{IngestionEnvelope, IngestionError, IngestionSink, SinkResponse};
use crate::config::IngestionConfig;
use crate::signing::{CredentialScope, IngestionNamespace};

/// Pipeline path appended to the ingestion endpoint host.
pub const INGESTION_PATH: &str = "/product-pipeline/test_ingestion_path";

const CONTENT_TYPE_JSON: &str = "application/json";

/// Build the pipeline URL. Endpoints without a scheme are treated as HTTPS hosts.
pub fn pipeline_url(endpoint: &str, path: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let base = if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Posts envelopes to the pipeline, signed for the `osis` service.
pub struct HttpIngestionClient {
    client: Client,
    url: String,
    scope: CredentialScope<IngestionNamespace>,
}

impl HttpIngestionClient {
    pub fn new(
        config: &IngestionConfig,
        scope: CredentialScope<IngestionNamespace>,
    ) -> Result<Self, IngestionError> {
        if config.endpoint.trim().is_empty() {
            return Err(IngestionError::Config(
                "ingestion endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: pipeline_url(&config.endpoint, &config.path),
            scope,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// SigV4 headers for a POST of `body` to the pipeline URL.
    async fn signature_headers(
        &self,
        body: &[u8],
    ) -> Result<Vec<(String, String)>, IngestionError> {
        let identity: Identity = self.scope.credentials().await?.into();

        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(self.scope.region())
            .name(self.scope.service())
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| IngestionError::Signing(e.to_string()))?
            .into();

        let headers = [(CONTENT_TYPE.as_str(), CONTENT_TYPE_JSON)];
        let request = SignableRequest::new(
            "POST",
            self.url.as_str(),
            headers.into_iter(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| IngestionError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| IngestionError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

#[async_trait]
impl IngestionSink for HttpIngestionClient {
    async fn forward(&self, envelope: &IngestionEnvelope) -> Result<SinkResponse, IngestionError> {
        let body = serde_json::to_vec(envelope)?;
        let signature = self.signature_headers(&body).await?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON);
        for (name, value) in signature {
            request = request.header(name, value);
        }

        debug!(url = %self.url, records = envelope.records().len(), "Forwarding to ingestion pipeline");
        let response = request.body(body).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let response = SinkResponse { status, body };

        if response.is_accepted() {
            info!(url = %self.url, status = %status, response = %response.body, "Ingestion forward accepted");
        } else {
            warn!(url = %self.url, status = %status, response = %response.body, "Ingestion forward not accepted");
        }

        Ok(response)
    }

    fn name(&self) -> &str {
        "osis-http"
    }
}
