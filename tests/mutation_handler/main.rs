//! Acceptance tests for the mutation handler using Cucumber.
//!
//! Scenarios run against the in-memory store and the recording ingestion
//! sink, so no Keyspaces cluster or pipeline is needed:
//!
//! ```bash
//! cargo test --test mutation_handler --features test-utils
//! ```

mod steps;

use cucumber::World;
use steps::MutationWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Mutation Handler Acceptance Tests ===\n");
    MutationWorld::cucumber()
        .fail_on_skipped()
        .run("tests/mutation_handler/features/mutation_handler.feature")
        .await;
}
