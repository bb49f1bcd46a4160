//! Amazon Keyspaces store backend.
//!
//! Connects with the CQL driver to `cassandra.<region>.amazonaws.com:9142`
//! over TLS pinned to a cached root certificate, authenticates with the SigV4
//! SASL mechanism, and runs every statement at `LOCAL_QUORUM`.

mod auth;
mod tls;

pub use auth::SigV4AuthProvider;
pub use tls::{ensure_root_certificate, tls_client_config, DEFAULT_CERT_FILE, DEFAULT_CERT_URL};

use std::sync::Arc;

use async_trait::async_trait;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::serialize::row::SerializeRow;
use scylla::statement::Consistency;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ProductStore, Result, StoreConnector, StoreError, StoreSession, TableRef};
use crate::config::StoreConfig;
use crate::mutation::Product;
use crate::signing::{CredentialScope, KeyspacesNamespace};

/// Execution profile every store statement runs under.
pub fn store_profile() -> ExecutionProfile {
    ExecutionProfile::builder()
        .consistency(Consistency::LocalQuorum)
        .build()
}

fn insert_statement(table: &TableRef) -> String {
    format!(
        "INSERT INTO {} (product_id, product_name, product_description) VALUES (?, ?, ?)",
        table
    )
}

fn update_statement(table: &TableRef) -> String {
    format!(
        "UPDATE {} SET product_name = ?, product_description = ? WHERE product_id = ?",
        table
    )
}

fn delete_statement(table: &TableRef) -> String {
    format!("DELETE FROM {} WHERE product_id = ?", table)
}

/// One driver session bound to the configured keyspace.
pub struct KeyspacesStore {
    session: Session,
}

impl KeyspacesStore {
    /// Wrap an established session. Statements inherit its default execution
    /// profile, so build it with [`store_profile`].
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Prepare and execute a statement with bound values.
    async fn run(&self, cql: String, values: impl SerializeRow + Send) -> Result<()> {
        let prepared = self
            .session
            .prepare(cql)
            .await
            .map_err(|e| StoreError::Statement(format!("prepare failed: {}", e)))?;

        self.session
            .execute_unpaged(&prepared, values)
            .await
            .map_err(|e| StoreError::Statement(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ProductStore for KeyspacesStore {
    async fn insert(&self, table: &TableRef, product: &Product) -> Result<()> {
        let (name, description) = product
            .attributes()
            .ok_or(StoreError::MissingAttributes(product.product_id))?;
        self.run(
            insert_statement(table),
            (product.product_id, name, description),
        )
        .await
    }

    async fn update(&self, table: &TableRef, product: &Product) -> Result<()> {
        let (name, description) = product
            .attributes()
            .ok_or(StoreError::MissingAttributes(product.product_id))?;
        self.run(
            update_statement(table),
            (name, description, product.product_id),
        )
        .await
    }

    async fn delete(&self, table: &TableRef, product: &Product) -> Result<()> {
        self.run(delete_statement(table), (product.product_id,)).await
    }
}

/// Opens Keyspaces sessions.
///
/// Unpooled (the default) opens a fresh driver session per acquisition and
/// tears it down, connection pool included, when the [`StoreSession`] drops.
/// Pooled keeps one driver session for the life of the process; the driver
/// already multiplexes concurrent statements over it.
pub struct KeyspacesConnector {
    contact_point: String,
    keyspace: String,
    scope: CredentialScope<KeyspacesNamespace>,
    tls: Arc<rustls::ClientConfig>,
    pool: Option<OnceCell<Arc<KeyspacesStore>>>,
}

impl KeyspacesConnector {
    /// Fetch (or reuse) the trust anchor and prepare the TLS and auth setup.
    pub async fn from_config(
        config: &StoreConfig,
        scope: CredentialScope<KeyspacesNamespace>,
    ) -> Result<Self> {
        let cert_path = ensure_root_certificate(&config.cert_dir(), &config.cert_url).await?;
        let host = config.contact_host_for(scope.region());
        let tls = tls_client_config(&cert_path, &host)?;
        let contact_point = config.contact_point_for(scope.region());

        info!(
            contact_point = %contact_point,
            keyspace = %config.keyspace,
            pooled = config.pooled,
            "Keyspaces connector configured"
        );

        Ok(Self {
            contact_point,
            keyspace: config.keyspace.clone(),
            scope,
            tls,
            pool: config.pooled.then(OnceCell::new),
        })
    }

    async fn open(&self) -> Result<KeyspacesStore> {
        let session = SessionBuilder::new()
            .known_node(&self.contact_point)
            .tls_context(Some(self.tls.clone()))
            .authenticator_provider(Arc::new(SigV4AuthProvider::new(self.scope.clone())))
            .default_execution_profile_handle(store_profile().into_handle())
            // The managed service exposes only a subset of the system schema tables.
            .fetch_schema_metadata(false)
            .use_keyspace(&self.keyspace, false)
            .build()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(contact_point = %self.contact_point, "Opened Keyspaces session");
        Ok(KeyspacesStore::new(session))
    }
}

#[async_trait]
impl StoreConnector for KeyspacesConnector {
    async fn connect(&self) -> Result<StoreSession> {
        match &self.pool {
            Some(cell) => {
                let store = cell
                    .get_or_try_init(|| async { self.open().await.map(Arc::new) })
                    .await?
                    .clone();
                Ok(StoreSession::new(store))
            }
            None => {
                let store = Arc::new(self.open().await?);
                let contact_point = self.contact_point.clone();
                Ok(StoreSession::new(store).on_release(move || {
                    debug!(contact_point = %contact_point, "Closing Keyspaces session");
                }))
            }
        }
    }
}
