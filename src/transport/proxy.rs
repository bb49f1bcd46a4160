//! Gateway proxy integration.
//!
//! The gateway hands over the request body as a string (possibly absent) and
//! expects a `{statusCode, headers, body}` response.

use serde::Deserialize;
use tracing::debug;

use crate::handler::{MutationHandler, ProxyResponse};

/// Subset of a gateway proxy event the handler needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyEvent {
    #[serde(default)]
    pub body: Option<String>,
}

/// Run one proxy event through the handler.
pub async fn handle_proxy_event(handler: &MutationHandler, event: ProxyEvent) -> ProxyResponse {
    debug!(has_body = event.body.is_some(), "Received proxy event");
    handler
        .handle_raw(event.body.as_deref())
        .await
        .into_proxy_response()
}
