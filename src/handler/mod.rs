//! Mutation handler: validate, write, then propagate.
//!
//! The ordering is the correctness contract. Ingestion is attempted only after
//! the store acknowledged the write with 200, and an ingestion failure never
//! rolls the write back. Store and index may therefore drift until the caller
//! retries; a retry after a successful write forwards again (at-least-once).

mod outcome;

#[cfg(test)]
mod tests;

pub use outcome::{MessageBody, MutationOutcome, ProxyResponse, CONTENT_TYPE_JSON};

use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::ingestion::{IngestionEnvelope, IngestionSink};
use crate::mutation::{decode_body, MutationRequest, ValidationError};
use crate::storage::{StoreConnector, TableRef};

/// Drives one mutation from request to unified outcome.
pub struct MutationHandler {
    connector: Arc<dyn StoreConnector>,
    sink: Arc<dyn IngestionSink>,
    table: TableRef,
}

impl MutationHandler {
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        sink: Arc<dyn IngestionSink>,
        table: TableRef,
    ) -> Self {
        Self {
            connector,
            sink,
            table,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Handle an undecoded request body.
    pub async fn handle_raw(&self, body: Option<&str>) -> MutationOutcome {
        match decode_body(body) {
            Ok(value) => self.handle(value).await,
            Err(e) => Self::rejected(e),
        }
    }

    /// Handle a decoded request body.
    pub async fn handle(&self, body: Value) -> MutationOutcome {
        let request = match MutationRequest::from_value(body) {
            Ok(request) => request,
            Err(e) => return Self::rejected(e),
        };

        info!(
            operation = %request.operation(),
            product_id = request.product().product_id,
            "Received mutation"
        );

        let store_status = self.apply(&request).await;
        if store_status != StatusCode::OK {
            return MutationOutcome::new(
                store_status,
                format!("Keyspace {} operation failed.", request.operation()),
            );
        }

        self.propagate(&request).await
    }

    /// Write to the store inside one scoped session.
    ///
    /// The session is dropped before this returns, so it is released before
    /// any ingestion traffic starts.
    async fn apply(&self, request: &MutationRequest) -> StatusCode {
        let session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!(
                    operation = %request.operation(),
                    error = %e,
                    "Failed to open Keyspaces session"
                );
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };

        session
            .execute(request.operation(), &self.table, request.product())
            .await
    }

    /// Forward the received body to ingestion and compose the final outcome.
    async fn propagate(&self, request: &MutationRequest) -> MutationOutcome {
        let body = request.body();
        let envelope = IngestionEnvelope::single(request.raw().clone());

        match self.sink.forward(&envelope).await {
            Ok(response) if response.is_accepted() => {
                MutationOutcome::ok(format!("Ingestion completed successfully for {}.", body))
            }
            Ok(response) => {
                warn!(
                    sink = %self.sink.name(),
                    status = %response.status,
                    response = %response.body,
                    operation = %request.operation(),
                    "Ingestion rejected mutation after successful write"
                );
                MutationOutcome::failed(format!("Ingestion failed for {}.", body))
            }
            Err(e) => {
                error!(
                    sink = %self.sink.name(),
                    error = %e,
                    operation = %request.operation(),
                    "Ingestion forward failed after successful write"
                );
                MutationOutcome::failed(format!("Ingestion failed for {}.", body))
            }
        }
    }

    fn rejected(e: ValidationError) -> MutationOutcome {
        error!(reason = %e.reason(), body = %e.body(), "Invalid payload");
        MutationOutcome::failed(e.to_string())
    }
}
