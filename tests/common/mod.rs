//! Fixtures shared by the integration tests
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use docket::prelude::*;
use serde_json::json;

pub fn super_admin() -> Caller {
    Caller::new("admin-1", Role::SuperAdmin)
}

pub fn employee() -> Caller {
    Caller::new("emp-1", Role::Employee)
}

/// Services over a fresh in-memory store, plus the store itself for
/// direct inspection
pub fn fresh() -> (Services, Store) {
    let store = Store::in_memory();
    let services = Services::new(store.clone(), &AppConfig::default());
    (services, store)
}

pub fn new_hub(name: &str) -> NewHub {
    serde_json::from_value(json!({
        "name": name,
        "address": format!("{name} industrial area"),
        "pincodes": [560001]
    }))
    .unwrap()
}

pub async fn seed_hub(services: &Services, name: &str) -> Hub {
    services.hubs.create(&super_admin(), new_hub(name)).await.unwrap()
}

pub fn new_order(docket: &str, source: &Hub, destination: &Hub) -> NewOrder {
    serde_json::from_value(json!({
        "docket_number": docket,
        "transport_type": "surface",
        "payment_method": "prepaid",
        "source_hub_id": source.id,
        "destination_hub_id": destination.id,
        "consignee": { "name": "Asha Rao", "number": "9800000001" },
        "items": [
            { "weight": 1.5 },
            { "weight": 2.5 }
        ]
    }))
    .unwrap()
}

/// Seed `count` orders with dockets starting at `first_docket`
pub async fn seed_orders(
    services: &Services,
    first_docket: u64,
    count: u64,
    source: &Hub,
    destination: &Hub,
) -> Vec<Order> {
    let mut orders = Vec::new();
    for docket in first_docket..first_docket + count {
        let order = services
            .orders
            .create(&employee(), new_order(&docket.to_string(), source, destination))
            .await
            .unwrap();
        orders.push(order);
    }
    orders
}

pub fn new_manifest(source: &Hub, destination: &Hub, orders: &[Uuid]) -> NewManifest {
    serde_json::from_value(json!({
        "source_hub_id": source.id,
        "destination_hub_id": destination.id,
        "vehicle_number": "KA01AB1234",
        "transport_type": "surface",
        "order_ids": orders
    }))
    .unwrap()
}

pub fn new_drs(hub: &Hub, orders: &[Uuid]) -> NewDrs {
    serde_json::from_value(json!({
        "hub_id": hub.id,
        "delivery_boy_id": "emp-42",
        "vehicle_number": "KA05MN2211",
        "order_ids": orders
    }))
    .unwrap()
}

pub fn ids(orders: &[Order]) -> Vec<Uuid> {
    orders.iter().map(|order| order.id).collect()
}

pub async fn order(store: &Store, id: &Uuid) -> Order {
    store.orders.get(id).await.unwrap().unwrap()
}
