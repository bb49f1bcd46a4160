//! Unified outcome returned to the caller.

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Content type of every response body.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Combined result of the store write and (when attempted) the ingestion forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub status_code: StatusCode,
    pub message: String,
}

/// `{"message": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Gateway proxy response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl MutationOutcome {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == StatusCode::OK
    }

    /// Serialized `{"message": ...}` body.
    pub fn body_json(&self) -> String {
        serde_json::json!({ "message": self.message }).to_string()
    }

    pub fn into_proxy_response(self) -> ProxyResponse {
        let body = self.body_json();
        ProxyResponse {
            status_code: self.status_code.as_u16(),
            headers: BTreeMap::from([("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string())]),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_response_shape() {
        let response = MutationOutcome::ok("done").into_proxy_response();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["headers"]["Content-Type"], "application/json");

        let body: MessageBody = serde_json::from_str(value["body"].as_str().unwrap()).unwrap();
        assert_eq!(body.message, "done");
    }

    #[test]
    fn test_body_escapes_message() {
        let outcome = MutationOutcome::failed(r#"Ingestion failed for {"a":"b"}."#);
        let body: MessageBody = serde_json::from_str(&outcome.body_json()).unwrap();
        assert_eq!(body.message, r#"Ingestion failed for {"a":"b"}."#);
        assert!(!outcome.is_success());
    }
}
