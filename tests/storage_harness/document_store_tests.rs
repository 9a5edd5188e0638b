//! Macro-generated contract suite for `DocumentStore<Order>`
//!
//! Exercised through the `orders` collection of a [`Store`]; the other
//! collections share the same generic implementation.
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_insert_and_get`
//! - `test_insert_duplicate_id`
//! - `test_get_many_keeps_requested_order`
//! - `test_replace` / `test_delete`
//!
//! ## Queries
//! - `test_find_eq_and_count`
//! - `test_find_contains_is_case_insensitive`
//! - `test_find_nested_array_path`
//! - `test_find_in`
//! - `test_find_sort_and_paginate`
//! - `test_find_created_at_range_across_second_boundary`
//!
//! ## Atomic updates
//! - `test_modify_missing` / `test_modify_unchanged_writes_nothing`
//! - `test_modify_changed_refreshes_updated_at`
//! - `test_concurrent_modify_loses_no_update`

/// Generate the document store conformance suite.
///
/// `$factory` must evaluate to a fresh, empty [`Store`]. It is re-evaluated
/// for every test.
#[macro_export]
macro_rules! document_store_tests {
    ($factory:expr) => {
        mod document_store_contract_tests {
            use super::*;
            use docket::core::error::EntityError;
            use docket::core::query::{Sort, SortOrder};

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_insert_and_get() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.5, 2.5]);

                store.orders.insert(order.clone()).await.unwrap();
                let stored = store.orders.get(&order.id).await.unwrap().unwrap();

                assert_eq!(stored.id, order.id);
                assert_eq!(stored.docket_number, "9001");
                assert_eq!(stored.items.len(), 2);
                assert_eq!(stored.items[0].item_id, "9001-1");
                assert!((stored.total_weight() - 4.0).abs() < f64::EPSILON);
                assert_eq!(stored.consignee, order.consignee);
                assert_eq!(stored.status, OrderStatus::Picked);

                assert!(store.orders.get(&Uuid::new_v4()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_insert_duplicate_id() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.0]);
                store.orders.insert(order.clone()).await.unwrap();

                let err: DocketError = store.orders.insert(order).await.unwrap_err().into();

                assert!(matches!(
                    err,
                    DocketError::Entity(EntityError::AlreadyExists { .. })
                ));
            }

            #[tokio::test]
            async fn test_get_many_keeps_requested_order() {
                let store: Store = $factory;
                let orders = sample_orders();
                for order in &orders {
                    store.orders.insert(order.clone()).await.unwrap();
                }

                let wanted = [orders[2].id, Uuid::new_v4(), orders[0].id];
                let found = store.orders.get_many(&wanted).await.unwrap();

                let ids: Vec<Uuid> = found.iter().map(|o| o.id).collect();
                assert_eq!(ids, vec![orders[2].id, orders[0].id]);
            }

            #[tokio::test]
            async fn test_replace() {
                let store: Store = $factory;
                let mut order = test_order("9001", "KA01AB1234", &[1.0]);
                store.orders.insert(order.clone()).await.unwrap();

                order.payment_method = "cod".to_string();
                let replaced = store.orders.replace(&order.id, order.clone()).await.unwrap();
                assert_eq!(replaced.map(|o| o.payment_method), Some("cod".to_string()));

                let ghost = test_order("9002", "KA01AB1234", &[1.0]);
                assert!(store.orders.replace(&ghost.id, ghost.clone()).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.0]);
                store.orders.insert(order.clone()).await.unwrap();

                assert!(store.orders.delete(&order.id).await.unwrap());
                assert!(!store.orders.delete(&order.id).await.unwrap());
                assert!(store.orders.get(&order.id).await.unwrap().is_none());
            }

            // ==================================================================
            // Queries
            // ==================================================================

            #[tokio::test]
            async fn test_find_eq_and_count() {
                let store: Store = $factory;
                for order in sample_orders() {
                    store.orders.insert(order).await.unwrap();
                }

                let condition = Condition::eq("docket_number", "9002");
                let found = store
                    .orders
                    .find(&DocumentQuery::new().filter(condition.clone()))
                    .await
                    .unwrap();

                assert_eq!(found.len(), 1);
                assert_eq!(found[0].items.len(), 2);
                assert_eq!(store.orders.count(&[condition]).await.unwrap(), 1);
                assert_eq!(store.orders.count(&[]).await.unwrap(), 3);
                assert_eq!(
                    store
                        .orders
                        .count(&[Condition::eq("docket_number", "0000")])
                        .await
                        .unwrap(),
                    0
                );
            }

            #[tokio::test]
            async fn test_find_contains_is_case_insensitive() {
                let store: Store = $factory;
                for order in sample_orders() {
                    store.orders.insert(order).await.unwrap();
                }

                let found = store
                    .orders
                    .find(&DocumentQuery::new().filter(Condition::contains(
                        "picked_vehicle_number",
                        "ka0",
                    )))
                    .await
                    .unwrap();

                assert_eq!(found.len(), 2);
            }

            #[tokio::test]
            async fn test_find_nested_array_path() {
                let store: Store = $factory;
                for order in sample_orders() {
                    store.orders.insert(order).await.unwrap();
                }

                let found = store
                    .orders
                    .find(&DocumentQuery::new().filter(Condition::eq("items.item_id", "9003-3")))
                    .await
                    .unwrap();

                assert_eq!(found.len(), 1);
                assert_eq!(found[0].docket_number, "9003");
            }

            #[tokio::test]
            async fn test_find_in() {
                let store: Store = $factory;
                for order in sample_orders() {
                    store.orders.insert(order).await.unwrap();
                }

                let condition = Condition::In {
                    field: "docket_number".to_string(),
                    values: vec!["9001".into(), "9003".into(), "7777".into()],
                };
                assert_eq!(store.orders.count(&[condition]).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_find_sort_and_paginate() {
                let store: Store = $factory;
                for order in sample_orders() {
                    store.orders.insert(order).await.unwrap();
                }

                let sort = Some(Sort {
                    field: "docket_number".to_string(),
                    order: SortOrder::Desc,
                });
                let first = store
                    .orders
                    .find(&DocumentQuery::new().sort(sort.clone()).paginate(1, 2))
                    .await
                    .unwrap();
                let second = store
                    .orders
                    .find(&DocumentQuery::new().sort(sort).paginate(2, 2))
                    .await
                    .unwrap();

                let dockets: Vec<&str> = first
                    .iter()
                    .chain(second.iter())
                    .map(|o| o.docket_number.as_str())
                    .collect();
                assert_eq!(dockets, vec!["9003", "9002", "9001"]);
                assert_eq!(second.len(), 1);
            }

            #[tokio::test]
            async fn test_find_created_at_range_across_second_boundary() {
                let store: Store = $factory;
                let base = "2026-03-01T10:00:00Z"
                    .parse::<chrono::DateTime<chrono::Utc>>()
                    .unwrap();
                let offsets = [0, 250, 1000];
                for (mut order, millis) in sample_orders().into_iter().zip(offsets) {
                    order.created_at = base + chrono::Duration::milliseconds(millis);
                    store.orders.insert(order).await.unwrap();
                }

                let window = DocumentQuery::new()
                    .filter(Condition::since("created_at", &base))
                    .filter(Condition::until(
                        "created_at",
                        &(base + chrono::Duration::milliseconds(250)),
                    ))
                    .sort(Some(Sort {
                        field: "created_at".to_string(),
                        order: SortOrder::Asc,
                    }));
                let found = store.orders.find(&window).await.unwrap();

                let dockets: Vec<&str> =
                    found.iter().map(|o| o.docket_number.as_str()).collect();
                assert_eq!(dockets, vec!["9001", "9002"]);
            }

            // ==================================================================
            // Atomic updates
            // ==================================================================

            #[tokio::test]
            async fn test_modify_missing() {
                let store: Store = $factory;
                let outcome = store
                    .orders
                    .modify(&Uuid::new_v4(), &|_: &mut Order| true)
                    .await
                    .unwrap();
                assert!(outcome.is_missing());
            }

            #[tokio::test]
            async fn test_modify_unchanged_writes_nothing() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.0]);
                store.orders.insert(order.clone()).await.unwrap();

                let outcome = store
                    .orders
                    .modify(&order.id, &|o: &mut Order| {
                        o.apply_status(OrderStatus::Picked, None, "no-op")
                    })
                    .await
                    .unwrap();

                assert!(matches!(outcome, Modified::Unchanged(_)));
                let stored = store.orders.get(&order.id).await.unwrap().unwrap();
                assert_eq!(stored.updated_at, order.updated_at);
                assert_eq!(stored.history.len(), order.history.len());
            }

            #[tokio::test]
            async fn test_modify_changed_refreshes_updated_at() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.0, 2.0]);
                store.orders.insert(order.clone()).await.unwrap();

                let outcome = store
                    .orders
                    .modify(&order.id, &|o: &mut Order| {
                        o.apply_status(OrderStatus::InTransit, Some("Pune"), "departed")
                    })
                    .await
                    .unwrap();

                assert!(outcome.is_changed());
                let stored = store.orders.get(&order.id).await.unwrap().unwrap();
                assert_eq!(stored.status, OrderStatus::InTransit);
                assert!(stored.items.iter().all(|i| i.status == OrderStatus::InTransit));
                assert!(stored.updated_at > order.updated_at);
                assert_eq!(stored.history.len(), order.history.len() + 1);
            }

            #[tokio::test]
            async fn test_concurrent_modify_loses_no_update() {
                let store: Store = $factory;
                let order = test_order("9001", "KA01AB1234", &[1.0]);
                store.orders.insert(order.clone()).await.unwrap();

                let tasks: Vec<_> = (0..8)
                    .map(|n| {
                        let orders = store.orders.clone();
                        let id = order.id;
                        tokio::spawn(async move {
                            let item_id = format!("extra-{n}");
                            orders
                                .modify(&id, &|o: &mut Order| {
                                    let mut item = o.items[0].clone();
                                    item.item_id = item_id.clone();
                                    o.items.push(item);
                                    true
                                })
                                .await
                        })
                    })
                    .collect();
                for task in tasks {
                    assert!(task.await.unwrap().unwrap().is_changed());
                }

                let stored = store.orders.get(&order.id).await.unwrap().unwrap();
                assert_eq!(stored.items.len(), 9);
            }
        }
    };
}
