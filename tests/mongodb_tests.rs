//! Runs the storage contract suites against MongoDB
//!
//! # Requirements
//!
//! - Docker must be running (testcontainers launches a MongoDB container)
//! - Feature flag `mongodb_backend` must be enabled
//!
//! # Running
//!
//! ```sh
//! cargo test --features mongodb_backend --test mongodb_tests
//! ```
//!
//! # Test isolation
//!
//! All tests share a single MongoDB container (via `OnceLock`). Each test
//! gets its own database, with the service's indexes created.

#![cfg(feature = "mongodb_backend")]

#[macro_use]
mod storage_harness;

use docket::prelude::*;
use docket::storage::ensure_indexes;
use mongodb::Client;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use storage_harness::*;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mongo::Mongo;

// ---------------------------------------------------------------------------
// Shared test environment (single container, fresh database per test)
// ---------------------------------------------------------------------------

struct MongoTestEnv {
    /// Dropping this stops the container
    _container: testcontainers::ContainerAsync<Mongo>,
    connection_url: String,
}

static TEST_ENV: OnceLock<MongoTestEnv> = OnceLock::new();

async fn init_mongo_env() -> &'static MongoTestEnv {
    if let Some(env) = TEST_ENV.get() {
        return env;
    }

    let container = Mongo::default()
        .start()
        .await
        .expect("Failed to start MongoDB container, is Docker running?");

    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(27017).await.unwrap();
    let url = format!("mongodb://{}:{}", host, port);

    let env = MongoTestEnv {
        _container: container,
        connection_url: url,
    };

    let _ = TEST_ENV.set(env);
    TEST_ENV.get().unwrap()
}

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

async fn mongo_store() -> Store {
    let env = init_mongo_env().await;
    let client = Client::with_uri_str(&env.connection_url)
        .await
        .expect("Failed to connect to MongoDB");
    let db_num = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let database = client.database(&format!("docket_test_{}", db_num));
    ensure_indexes(&database)
        .await
        .expect("Failed to create indexes");
    Store::mongodb(database)
}

// ---------------------------------------------------------------------------
// Test suites via macros
// ---------------------------------------------------------------------------

document_store_tests!(mongo_store().await);
sequence_store_tests!(mongo_store().await);

#[tokio::test]
async fn test_docket_unique_index() {
    let store = mongo_store().await;
    store
        .orders
        .insert(test_order("9100", "KA01AB1234", &[1.0]))
        .await
        .unwrap();

    let err: DocketError = store
        .orders
        .insert(test_order("9100", "KA01AB9999", &[2.0]))
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.error_code(), "ENTITY_ALREADY_EXISTS");
}
