//! catalog-sync-server: product mutation API
//!
//! Accepts insert/update/delete mutations over HTTP, writes them to the
//! Keyspaces product table, and forwards successful writes to the ingestion
//! pipeline.
//!
//! ## Architecture
//! ```text
//! [client] --POST /mutations--> [catalog-sync-server] --CQL/TLS+SigV4--> [Keyspaces]
//!                                        |
//!                                        +--HTTPS+SigV4(osis)--> [ingestion pipeline]
//! ```
//!
//! ## Configuration
//! - store.keyspace / KEYSPACE_NAME
//! - store.table / TABLE_NAME
//! - ingestion.endpoint / INGESTION_ENDPOINT
//! - region: AWS region (default: SDK resolution)
//! - server.port: HTTP port (default: 8080)

use std::sync::Arc;

use tracing::{error, info};

use catalog_sync::config::Config;
use catalog_sync::handler::MutationHandler;
use catalog_sync::ingestion::HttpIngestionClient;
use catalog_sync::signing::{CredentialScope, IngestionNamespace, KeyspacesNamespace};
use catalog_sync::storage::keyspaces::KeyspacesConnector;
use catalog_sync::storage::TableRef;
use catalog_sync::transport::serve;
use catalog_sync::utils::bootstrap::{init_tracing, parse_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate()?;

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    let store_scope =
        CredentialScope::<KeyspacesNamespace>::from_sdk_config(&sdk_config, config.region.as_deref())?;
    let ingestion_scope =
        CredentialScope::<IngestionNamespace>::from_sdk_config(&sdk_config, config.region.as_deref())?;

    let table = TableRef::new(&config.store.keyspace, &config.store.table)?;
    let connector = KeyspacesConnector::from_config(&config.store, store_scope).await?;
    let sink = HttpIngestionClient::new(&config.ingestion, ingestion_scope)?;

    info!(
        table = %table,
        ingestion_url = %sink.url(),
        "catalog-sync-server started"
    );

    let handler = Arc::new(MutationHandler::new(
        Arc::new(connector),
        Arc::new(sink),
        table,
    ));

    serve(handler, &config.server.bind_addr()).await
}
