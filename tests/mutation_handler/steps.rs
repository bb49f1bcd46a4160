//! Mutation handler step definitions.

use std::fmt;
use std::sync::Arc;

use catalog_sync::handler::{MutationHandler, MutationOutcome};
use catalog_sync::ingestion::mock::MockIngestionSink;
use catalog_sync::storage::mock::MockConnector;
use catalog_sync::storage::TableRef;
use cucumber::{gherkin::Step, given, then, when, World};
use http::StatusCode;
use serde_json::Value;

/// Test context for mutation scenarios.
#[derive(World)]
#[world(init = Self::new)]
pub struct MutationWorld {
    connector: Arc<MockConnector>,
    sink: Arc<MockIngestionSink>,
    handler: MutationHandler,
    last_body: Option<String>,
    last_outcome: Option<MutationOutcome>,
}

impl fmt::Debug for MutationWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationWorld")
            .field("table", self.handler.table())
            .field("last_body", &self.last_body)
            .field("last_outcome", &self.last_outcome)
            .finish()
    }
}

impl MutationWorld {
    fn new() -> Self {
        let connector = Arc::new(MockConnector::new());
        let sink = Arc::new(MockIngestionSink::new());
        let table = TableRef::new("productsearch", "product_by_item")
            .expect("valid table reference");
        let handler = MutationHandler::new(connector.clone(), sink.clone(), table);
        Self {
            connector,
            sink,
            handler,
            last_body: None,
            last_outcome: None,
        }
    }

    fn outcome(&self) -> &MutationOutcome {
        self.last_outcome
            .as_ref()
            .expect("No mutation has been submitted")
    }

    fn last_body_json(&self) -> Value {
        let body = self.last_body.as_deref().expect("No body submitted");
        serde_json::from_str(body).expect("Submitted body is JSON")
    }

    async fn submit(&mut self, body: Option<String>) {
        let outcome = self.handler.handle_raw(body.as_deref()).await;
        self.last_body = body;
        self.last_outcome = Some(outcome);
    }
}

fn docstring(step: &Step) -> String {
    step.docstring
        .as_ref()
        .expect("Step requires a docstring")
        .trim()
        .to_string()
}

// --- Given steps ---

#[given("an empty product table")]
async fn given_empty_table(world: &mut MutationWorld) {
    assert_eq!(world.connector.store().row_count().await, 0);
}

#[given("the store rejects writes")]
async fn given_store_rejects_writes(world: &mut MutationWorld) {
    world.connector.store().set_fail_on_write(true);
}

#[given("the store is unreachable")]
async fn given_store_unreachable(world: &mut MutationWorld) {
    world.connector.set_fail_on_connect(true);
}

#[given(expr = "the ingestion pipeline responds with status {int}")]
async fn given_pipeline_status(world: &mut MutationWorld, status: u16) {
    let status = StatusCode::from_u16(status).expect("valid status code");
    world.sink.set_status(status).await;
}

#[given("the ingestion pipeline is unreachable")]
async fn given_pipeline_unreachable(world: &mut MutationWorld) {
    world.sink.set_fail_transport(true).await;
}

// --- When steps ---

#[when("I submit the mutation:")]
async fn when_submit(world: &mut MutationWorld, step: &Step) {
    let body = docstring(step);
    world.submit(Some(body)).await;
}

#[when("I submit the same mutation again")]
async fn when_submit_again(world: &mut MutationWorld) {
    let body = world.last_body.clone();
    world.submit(body).await;
}

#[when("I submit a request without a body")]
async fn when_submit_without_body(world: &mut MutationWorld) {
    world.submit(None).await;
}

// --- Then steps ---

#[then(expr = "the response status is {int}")]
async fn then_status(world: &mut MutationWorld, status: u16) {
    assert_eq!(world.outcome().status_code.as_u16(), status);
}

#[then("the response reports ingestion success for the submitted body")]
async fn then_ingestion_success(world: &mut MutationWorld) {
    let expected = format!(
        "Ingestion completed successfully for {}.",
        world.last_body_json()
    );
    assert_eq!(world.outcome().message, expected);
}

#[then("the response reports ingestion failure for the submitted body")]
async fn then_ingestion_failure(world: &mut MutationWorld) {
    let expected = format!("Ingestion failed for {}.", world.last_body_json());
    assert_eq!(world.outcome().message, expected);
}

#[then(expr = "the response message is {string}")]
async fn then_message(world: &mut MutationWorld, message: String) {
    assert_eq!(world.outcome().message, message);
}

#[then(expr = "the response message starts with {string}")]
async fn then_message_prefix(world: &mut MutationWorld, prefix: String) {
    let message = &world.outcome().message;
    assert!(
        message.starts_with(&prefix),
        "expected {:?} to start with {:?}",
        message,
        prefix
    );
}

#[then(expr = "product {int} is stored with name {string}")]
async fn then_product_stored(world: &mut MutationWorld, product_id: i32, name: String) {
    let row = world
        .connector
        .store()
        .row(world.handler.table(), product_id)
        .await
        .unwrap_or_else(|| panic!("product {} not stored", product_id));
    assert_eq!(row.product_name, name);
}

#[then(expr = "product {int} is not stored")]
async fn then_product_absent(world: &mut MutationWorld, product_id: i32) {
    let row = world
        .connector
        .store()
        .row(world.handler.table(), product_id)
        .await;
    assert!(row.is_none(), "product {} unexpectedly stored", product_id);
}

#[then("the store was not contacted")]
async fn then_store_untouched(world: &mut MutationWorld) {
    assert_eq!(world.connector.connect_count(), 0);
    assert_eq!(world.connector.store().write_count(), 0);
}

#[then(expr = "{int} mutation(s) was/were forwarded to ingestion")]
async fn then_forward_count(world: &mut MutationWorld, count: usize) {
    assert_eq!(world.sink.forward_count().await, count);
}

#[then("the last forwarded batch holds exactly the submitted body")]
async fn then_forwarded_body(world: &mut MutationWorld) {
    let forwarded = world.sink.forwarded().await;
    let last = forwarded.last().expect("nothing forwarded");
    assert_eq!(last.records(), &[world.last_body_json()]);
}

#[then("no store session remains open")]
async fn then_sessions_closed(world: &mut MutationWorld) {
    assert_eq!(world.connector.open_sessions(), 0);
}
