//! HTTP API for mutations.
//!
//! Endpoints:
//! - `POST /` or `POST /mutations`: apply a mutation, respond `{"message": ...}`
//! - `POST /invocations`: gateway proxy event in, proxy response out
//! - `GET /health`: liveness

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::proxy::{handle_proxy_event, ProxyEvent};
use crate::handler::{MutationHandler, MutationOutcome, ProxyResponse, CONTENT_TYPE_JSON};

/// Shared state for axum handlers.
type AppState = Arc<MutationHandler>;

/// Serve the API until Ctrl-C.
pub async fn serve(
    handler: Arc<MutationHandler>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "mutation API listening");

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(handler: Arc<MutationHandler>) -> Router {
    Router::new()
        .route("/", post(mutate))
        .route("/mutations", post(mutate))
        .route("/invocations", post(invoke))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn mutate(State(handler): State<AppState>, body: Bytes) -> Response {
    let body = std::str::from_utf8(&body).ok();
    handler.handle_raw(body).await.into_response()
}

/// The proxy response is always delivered with 200; its own `statusCode`
/// carries the mutation outcome.
async fn invoke(
    State(handler): State<AppState>,
    Json(event): Json<ProxyEvent>,
) -> Json<ProxyResponse> {
    Json(handle_proxy_event(&handler, event).await)
}

impl IntoResponse for MutationOutcome {
    fn into_response(self) -> Response {
        let body = self.body_json();
        (self.status_code, [(CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response()
    }
}
