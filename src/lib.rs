//! catalog-sync - product mutation relay.
//!
//! Applies insert/update/delete mutations for product rows to an Amazon
//! Keyspaces table and, once the write is acknowledged, forwards the same
//! mutation to an OpenSearch Ingestion pipeline.
//!
//! ```text
//! request -> validate -> [store write] --200--> [ingestion forward] -> outcome
//!                              |
//!                              +--500--> outcome (no forward)
//! ```

pub mod config;
pub mod handler;
pub mod ingestion;
pub mod mutation;
pub mod signing;
pub mod storage;
pub mod transport;
pub mod utils;
