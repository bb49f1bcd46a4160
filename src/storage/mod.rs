//! Store client for product rows.
//!
//! The handler never talks to a driver directly. It acquires a scoped
//! [`StoreSession`] from a [`StoreConnector`], runs one statement, and lets the
//! session drop. Statement faults are turned into status codes by the session
//! so the handler only ever sees data.
//!
//! ## Backends
//!
//! - `KeyspacesConnector` (feature: keyspaces) - Amazon Keyspaces over TLS + SigV4
//! - `MockConnector` - in-memory rows for tests

use std::fmt;

use async_trait::async_trait;

use crate::mutation::Product;

mod session;

#[cfg(feature = "keyspaces")]
pub mod keyspaces;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use session::StoreSession;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid CQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Product {0} is missing product_name or product_description")]
    MissingAttributes(i32),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Statement failed: {0}")]
    Statement(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Fully-qualified table identifier, rendered as `<keyspace>.<table>`.
///
/// Identifiers are the only part of a statement not bound as parameters, so
/// they are restricted to `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    keyspace: String,
    table: String,
}

impl TableRef {
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let keyspace = keyspace.into();
        let table = table.into();
        for ident in [&keyspace, &table] {
            if !is_identifier(ident) {
                return Err(StoreError::InvalidIdentifier(ident.clone()));
            }
        }
        Ok(Self { keyspace, table })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parameterized write primitives against the product table.
///
/// Semantics follow the store: insert and update are both upserts, and
/// deleting an absent key succeeds.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Write all three columns unconditionally.
    async fn insert(&self, table: &TableRef, product: &Product) -> Result<()>;

    /// Set name and description for `product_id` (creates the row if absent).
    async fn update(&self, table: &TableRef, product: &Product) -> Result<()>;

    /// Remove the row for `product_id`.
    async fn delete(&self, table: &TableRef, product: &Product) -> Result<()>;
}

/// Source of scoped store sessions.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Acquire a session. The session is released when dropped.
    async fn connect(&self) -> Result<StoreSession>;
}
