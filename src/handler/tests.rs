//! Unit tests for the mutation handler against the in-memory store and sink.

use std::sync::Arc;

use http::StatusCode;
use serde_json::{json, Value};

use super::MutationHandler;
use crate::ingestion::mock::MockIngestionSink;
use crate::storage::mock::MockConnector;
use crate::storage::TableRef;

struct Harness {
    connector: Arc<MockConnector>,
    sink: Arc<MockIngestionSink>,
    handler: MutationHandler,
}

fn harness() -> Harness {
    let connector = Arc::new(MockConnector::new());
    let sink = Arc::new(MockIngestionSink::new());
    let table = TableRef::new("productsearch", "product_by_item").unwrap();
    let handler = MutationHandler::new(connector.clone(), sink.clone(), table);
    Harness {
        connector,
        sink,
        handler,
    }
}

fn sweater(operation: &str) -> Value {
    json!({
        "operation": operation,
        "item": {
            "product_id": 100,
            "product_name": "Reindeer sweater",
            "product_description": "A Christmas sweater."
        }
    })
}

#[tokio::test]
async fn test_insert_happy_path() {
    let h = harness();
    let body = sweater("insert");

    let outcome = h.handler.handle(body.clone()).await;

    assert_eq!(outcome.status_code, StatusCode::OK);
    assert_eq!(
        outcome.message,
        format!("Ingestion completed successfully for {}.", body)
    );

    let forwarded = h.sink.forwarded().await;
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].records(), &[body]);

    let row = h
        .connector
        .store()
        .row(h.handler.table(), 100)
        .await
        .expect("row written");
    assert_eq!(row.product_name, "Reindeer sweater");
    assert_eq!(h.connector.open_sessions(), 0);
}

#[tokio::test]
async fn test_invalid_operation_touches_nothing() {
    let h = harness();

    let outcome = h
        .handler
        .handle(json!({"operation": "archive", "item": {}}))
        .await;

    assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(outcome.message.starts_with("Invalid payload"));
    assert_eq!(h.connector.connect_count(), 0);
    assert_eq!(h.connector.store().write_count(), 0);
    assert_eq!(h.sink.forward_count().await, 0);
}

#[tokio::test]
async fn test_item_not_a_mapping_touches_nothing() {
    let h = harness();

    for body in [
        json!({"operation": "insert", "item": "sweater"}),
        json!({"operation": "update"}),
        json!(["insert"]),
    ] {
        let outcome = h.handler.handle(body).await;
        assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert_eq!(h.connector.connect_count(), 0);
    assert_eq!(h.sink.forward_count().await, 0);
}

#[tokio::test]
async fn test_store_failure_skips_ingestion() {
    let h = harness();
    h.connector.store().set_fail_on_write(true);

    let outcome = h.handler.handle(sweater("insert")).await;

    assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.message, "Keyspace insert operation failed.");
    assert_eq!(h.sink.forward_count().await, 0);
    assert_eq!(h.connector.open_sessions(), 0);
}

#[tokio::test]
async fn test_connect_failure_skips_ingestion() {
    let h = harness();
    h.connector.set_fail_on_connect(true);

    let outcome = h.handler.handle(sweater("update")).await;

    assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.message, "Keyspace update operation failed.");
    assert_eq!(h.sink.forward_count().await, 0);
}

#[tokio::test]
async fn test_sink_rejection_keeps_write() {
    let h = harness();
    h.sink.set_status(StatusCode::BAD_REQUEST).await;
    let body = sweater("insert");

    let outcome = h.handler.handle(body.clone()).await;

    assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.message, format!("Ingestion failed for {}.", body));
    assert!(h.connector.store().row(h.handler.table(), 100).await.is_some());
}

#[tokio::test]
async fn test_sink_non_ok_success_codes_are_failures() {
    for status in [StatusCode::CREATED, StatusCode::NO_CONTENT] {
        let h = harness();
        h.sink.set_status(status).await;
        let body = sweater("insert");

        let outcome = h.handler.handle(body.clone()).await;

        assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.message, format!("Ingestion failed for {}.", body));
    }
}

#[tokio::test]
async fn test_sink_transport_failure_maps_to_500() {
    let h = harness();
    h.sink.set_fail_transport(true).await;
    let body = sweater("update");

    let outcome = h.handler.handle(body.clone()).await;

    assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(outcome.message, format!("Ingestion failed for {}.", body));
    assert_eq!(h.sink.forward_count().await, 1);
}

#[tokio::test]
async fn test_delete_twice_succeeds() {
    let h = harness();
    let body = json!({"operation": "delete", "item": {"product_id": 100}});

    let first = h.handler.handle(body.clone()).await;
    let second = h.handler.handle(body).await;

    assert_eq!(first.status_code, StatusCode::OK);
    assert_eq!(second.status_code, StatusCode::OK);
    assert_eq!(h.sink.forward_count().await, 2);
}

#[tokio::test]
async fn test_update_of_absent_row_upserts() {
    let via_update = harness();
    let via_insert = harness();

    let updated = via_update.handler.handle(sweater("update")).await;
    let inserted = via_insert.handler.handle(sweater("insert")).await;

    assert_eq!(updated.status_code, StatusCode::OK);
    assert_eq!(inserted.status_code, StatusCode::OK);

    let table = via_update.handler.table();
    assert_eq!(via_update.connector.store().row_count().await, 1);
    assert_eq!(
        via_update.connector.store().row(table, 100).await,
        via_insert.connector.store().row(table, 100).await
    );
}

#[tokio::test]
async fn test_delete_removes_inserted_row() {
    let h = harness();
    h.handler.handle(sweater("insert")).await;

    let outcome = h
        .handler
        .handle(json!({"operation": "delete", "item": {"product_id": 100}}))
        .await;

    assert!(outcome.is_success());
    assert_eq!(h.connector.store().row_count().await, 0);
}

#[tokio::test]
async fn test_handle_raw_rejects_undecodable_body() {
    let h = harness();

    for raw in [None, Some(""), Some("{\"operation\": ")] {
        let outcome = h.handler.handle_raw(raw).await;
        assert_eq!(outcome.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(outcome.message.starts_with("Invalid payload"));
    }
    assert_eq!(h.connector.connect_count(), 0);
}

#[tokio::test]
async fn test_every_valid_operation_forwards_once() {
    for operation in ["insert", "update", "delete"] {
        let h = harness();
        let body = sweater(operation);

        let outcome = h.handler.handle(body.clone()).await;

        assert_eq!(outcome.status_code, StatusCode::OK, "{}", operation);
        let forwarded = h.sink.forwarded().await;
        assert_eq!(forwarded.len(), 1, "{}", operation);
        assert_eq!(forwarded[0].records(), &[body]);
        assert_eq!(h.connector.connect_count(), 1);
        assert_eq!(h.connector.open_sessions(), 0);
    }
}
