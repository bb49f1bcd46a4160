//! Scoped store session.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error, info};

use super::{ProductStore, TableRef};
use crate::mutation::{Operation, Product};

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// One acquired session to the store.
///
/// Dropping the session releases it, so every exit path (success, store
/// fault, early return, or panic unwinding) gives the connection back.
pub struct StoreSession {
    store: Arc<dyn ProductStore>,
    release: Option<ReleaseHook>,
}

impl StoreSession {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self {
            store,
            release: None,
        }
    }

    /// Run `hook` when the session is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    /// Execute one mutation, mapping the outcome to 200 or 500.
    ///
    /// Faults are logged here and never propagated.
    pub async fn execute(
        &self,
        operation: Operation,
        table: &TableRef,
        product: &Product,
    ) -> StatusCode {
        let result = match operation {
            Operation::Insert => self.store.insert(table, product).await,
            Operation::Update => self.store.update(table, product).await,
            Operation::Delete => self.store.delete(table, product).await,
        };

        match result {
            Ok(()) => {
                info!(
                    operation = %operation,
                    table = %table,
                    product_id = product.product_id,
                    "Keyspaces write succeeded"
                );
                StatusCode::OK
            }
            Err(e) => {
                error!(
                    operation = %operation,
                    table = %table,
                    product_id = product.product_id,
                    error = %e,
                    "Keyspaces write failed"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub async fn insert_item(&self, table: &TableRef, product: &Product) -> StatusCode {
        self.execute(Operation::Insert, table, product).await
    }

    pub async fn update_item(&self, table: &TableRef, product: &Product) -> StatusCode {
        self.execute(Operation::Update, table, product).await
    }

    pub async fn delete_item(&self, table: &TableRef, product: &Product) -> StatusCode {
        self.execute(Operation::Delete, table, product).await
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        debug!("Store session released");
    }
}
