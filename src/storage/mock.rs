//! In-memory store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProductStore, Result, StoreConnector, StoreError, StoreSession, TableRef};
use crate::mutation::Product;

/// Stored product columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub product_name: String,
    pub product_description: String,
}

/// Rows keyed by (`<keyspace>.<table>`, product_id).
type RowKey = (String, i32);

/// Mock product table with upsert semantics and failure injection.
#[derive(Default)]
pub struct MockProductStore {
    rows: RwLock<HashMap<RowKey, ProductRow>>,
    fail_on_write: AtomicBool,
    writes: AtomicUsize,
}

impl MockProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    /// Number of statements attempted (including failed ones).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn row(&self, table: &TableRef, product_id: i32) -> Option<ProductRow> {
        self.rows
            .read()
            .await
            .get(&(table.to_string(), product_id))
            .cloned()
    }

    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    fn begin(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(StoreError::Statement("injected write failure".to_string()));
        }
        Ok(())
    }

    async fn upsert(&self, table: &TableRef, product: &Product) -> Result<()> {
        self.begin()?;
        let (name, description) = product
            .attributes()
            .ok_or(StoreError::MissingAttributes(product.product_id))?;
        self.rows.write().await.insert(
            (table.to_string(), product.product_id),
            ProductRow {
                product_name: name.to_string(),
                product_description: description.to_string(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MockProductStore {
    async fn insert(&self, table: &TableRef, product: &Product) -> Result<()> {
        self.upsert(table, product).await
    }

    async fn update(&self, table: &TableRef, product: &Product) -> Result<()> {
        self.upsert(table, product).await
    }

    async fn delete(&self, table: &TableRef, product: &Product) -> Result<()> {
        self.begin()?;
        self.rows
            .write()
            .await
            .remove(&(table.to_string(), product.product_id));
        Ok(())
    }
}

/// Connector handing out sessions over a shared [`MockProductStore`].
///
/// Tracks how many sessions were acquired and how many are still open.
#[derive(Default)]
pub struct MockConnector {
    store: Arc<MockProductStore>,
    open_sessions: Arc<AtomicUsize>,
    connects: AtomicUsize,
    fail_on_connect: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<MockProductStore>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn store(&self) -> &Arc<MockProductStore> {
        &self.store
    }

    pub fn set_fail_on_connect(&self, fail: bool) {
        self.fail_on_connect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MockConnector {
    async fn connect(&self) -> Result<StoreSession> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_connect.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("injected connect failure".to_string()));
        }

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        let open = self.open_sessions.clone();
        let store: Arc<dyn ProductStore> = self.store.clone();
        Ok(StoreSession::new(store).on_release(move || {
            open.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}
