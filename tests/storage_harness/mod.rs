//! Shared test harness for storage backend testing
//!
//! Builds orders with varied fields and exposes the
//! `document_store_tests!` and `sequence_store_tests!` suites, which any
//! [`Store`](docket::storage::Store) factory can be run through.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! document_store_tests!(Store::in_memory());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod document_store_tests;
#[macro_use]
pub mod sequence_store_tests;

use docket::prelude::*;
use serde_json::json;

/// An order with one item per weight and the given status
pub fn test_order(docket: &str, vehicle: &str, weights: &[f64]) -> Order {
    let items: Vec<_> = weights.iter().map(|w| json!({ "weight": w })).collect();
    let input: NewOrder = serde_json::from_value(json!({
        "docket_number": docket,
        "transport_type": "surface",
        "payment_method": "prepaid",
        "source_hub_id": Uuid::new_v4(),
        "destination_hub_id": Uuid::new_v4(),
        "consignee": { "company_name": "Acme Traders" },
        "items": items,
        "picked_vehicle_number": vehicle
    }))
    .unwrap();
    input.into_order("emp-1")
}

/// Three orders with distinct dockets, vehicles and item counts
pub fn sample_orders() -> Vec<Order> {
    vec![
        test_order("9001", "KA01AB1234", &[1.0]),
        test_order("9002", "MH12XY0001", &[2.0, 3.0]),
        test_order("9003", "KA05CD7777", &[0.5, 0.5, 0.5]),
    ]
}
