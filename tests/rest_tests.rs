//! End-to-end tests of the REST surface through `axum-test`

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use common::*;
use docket::core::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use docket::prelude::*;
use serde_json::{Value, json};

// =============================================================================
// Helpers
// =============================================================================

async fn create_test_server() -> (TestServer, Services, Store) {
    let (services, store) = fresh();
    let app = ServerBuilder::new()
        .with_services(services.clone())
        .build()
        .expect("Failed to build app");
    let server = TestServer::try_new(app).expect("Failed to create test server");
    (server, services, store)
}

fn signed(request: TestRequest, id: &'static str, role: &'static str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_static(id),
        )
        .add_header(
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderValue::from_static(role),
        )
}

fn as_employee(request: TestRequest) -> TestRequest {
    signed(request, "emp-1", "employee")
}

fn as_super_admin(request: TestRequest) -> TestRequest {
    signed(request, "admin-1", "super_admin")
}

// =============================================================================
// Health and identity
// =============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints_need_no_identity() {
        let (server, _, _) = create_test_server().await;

        for path in ["/health", "/healthz"] {
            let response = server.get(path).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["status"], "ok");
            assert_eq!(body["service"], "docket");
        }
    }

    #[tokio::test]
    async fn test_resource_routes_require_identity() {
        let (server, _, _) = create_test_server().await;

        let response = server.get("/manifest").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNAUTHORIZED");

        let response = server
            .get("/drs")
            .add_header(
                HeaderName::from_static(USER_ID_HEADER),
                HeaderValue::from_static("emp-1"),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

// =============================================================================
// Hubs and orders
// =============================================================================

mod record_tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_creation_is_super_admin_only() {
        let (server, _, store) = create_test_server().await;
        let body = json!({ "name": "Bangalore", "address": "Peenya" });

        let response = as_employee(server.post("/hubs").json(&body)).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(store.hubs.count(&[]).await.unwrap(), 0);

        let response = as_super_admin(server.post("/hubs").json(&body)).await;
        response.assert_status(StatusCode::CREATED);
        let hub: Value = response.json();
        assert_eq!(hub["name"], "Bangalore");
        assert_eq!(hub["status"], "Active");
    }

    #[tokio::test]
    async fn test_hub_archive_route() {
        let (server, services, _) = create_test_server().await;
        let hub = seed_hub(&services, "Bangalore").await;

        let response = as_super_admin(server.put(&format!("/hubs/{}/archive", hub.id))).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "Inactive");
    }

    #[tokio::test]
    async fn test_order_list_and_duplicate_docket() {
        let (server, services, _) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        seed_orders(&services, 7001, 3, &blr, &blr).await;

        let response = as_employee(server.get("/orders").add_query_param("limit", 2)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["has_next"], true);

        let response = as_employee(
            server
                .get("/orders")
                .add_query_param("docket_number", "7002"),
        )
        .await;
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["docket_number"], "7002");
    }
}

// =============================================================================
// Manifests
// =============================================================================

mod manifest_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_move_through_statuses() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let pune = seed_hub(&services, "Pune").await;
        let orders = seed_orders(&services, 7101, 2, &blr, &pune).await;

        let response = as_employee(server.post("/manifest").json(&json!({
            "sourceHubID": blr.id,
            "destinationHubID": pune.id,
            "vehicleNumber": "KA01AB1234",
            "transport_type": "surface",
            "orderIDs": ids(&orders)
        })))
        .await;
        response.assert_status(StatusCode::CREATED);
        let manifest: Value = response.json();
        assert_eq!(manifest["code"], "BANA000001");
        assert_eq!(manifest["status"], "Pending");
        assert_eq!(manifest["individual_orders"], 2);
        let id = manifest["id"].as_str().unwrap().to_string();

        let response =
            as_employee(server.put(&format!("/manifest/{id}/status/In%20Transit"))).await;
        response.assert_status_ok();
        let manifest: Value = response.json();
        assert_eq!(manifest["status"], "In Transit");
        assert_eq!(order(&store, &orders[0].id).await.status, OrderStatus::InTransit);

        let response = as_employee(server.get(&format!("/manifest/{id}"))).await;
        response.assert_status_ok();
        let view: Value = response.json();
        assert_eq!(view["source_hub"]["name"], "Bangalore");
        assert_eq!(view["orders"][0]["items"][0]["status"], "In Transit");
    }

    #[tokio::test]
    async fn test_create_with_unknown_order_is_not_found() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let pune = seed_hub(&services, "Pune").await;
        let ghost = Uuid::new_v4();

        let response = as_employee(server.post("/manifest").json(&json!({
            "source_hub_id": blr.id,
            "destination_hub_id": pune.id,
            "vehicle_number": "KA01AB1234",
            "transport_type": "air",
            "order_ids": [ghost]
        })))
        .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_REFERENCES");
        assert_eq!(body["details"]["ids"][0], ghost.to_string());
        assert_eq!(store.manifests.count(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (server, _, _) = create_test_server().await;

        let response = as_employee(
            server
                .post("/manifest")
                .json(&json!({ "vehicle_number": "KA01AB1234" })),
        )
        .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_remove_order_route() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let pune = seed_hub(&services, "Pune").await;
        let orders = seed_orders(&services, 7201, 2, &blr, &pune).await;
        let manifest = services
            .manifests
            .create(&employee(), new_manifest(&blr, &pune, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(server.delete(&format!(
            "/manifest/{}/order/{}",
            manifest.id, orders[0].id
        )))
        .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));
        assert_eq!(
            order(&store, &orders[0].id).await.status,
            OrderStatus::ReachedDestinationHub
        );
    }

    #[tokio::test]
    async fn test_update_body_status_moves_claims() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let pune = seed_hub(&services, "Pune").await;
        let orders = seed_orders(&services, 7251, 1, &blr, &pune).await;
        let manifest = services
            .manifests
            .create(&employee(), new_manifest(&blr, &pune, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(
            server
                .put(&format!("/manifest/{}", manifest.id))
                .json(&json!({ "status": "Delivered" })),
        )
        .await;
        response.assert_status_ok();
        let held = order(&store, &orders[0].id).await;
        assert_eq!(held.status, OrderStatus::ReachedDestinationHub);
        assert_eq!(held.manifest_id, None);

        let response = as_employee(
            server
                .put(&format!("/manifest/{}", manifest.id))
                .json(&json!({ "status": "In Transit" })),
        )
        .await;
        response.assert_status_ok();
        let held = order(&store, &orders[0].id).await;
        assert_eq!(held.status, OrderStatus::InTransit);
        assert_eq!(held.manifest_id, Some(manifest.id));

        let response = as_employee(server.post("/manifest").json(&json!({
            "sourceHubID": blr.id,
            "destinationHubID": pune.id,
            "vehicleNumber": "KA01AB9999",
            "transport_type": "surface",
            "orderIDs": ids(&orders)
        })))
        .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "ALREADY_ASSIGNED");
    }

    #[tokio::test]
    async fn test_list_accepts_camel_case_filters() {
        let (server, services, _) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let pune = seed_hub(&services, "Pune").await;
        let orders = seed_orders(&services, 7271, 2, &blr, &pune).await;
        services
            .manifests
            .create(&employee(), new_manifest(&blr, &pune, &[orders[0].id]))
            .await
            .unwrap();
        let mut by_air = new_manifest(&blr, &pune, &[orders[1].id]);
        by_air.transport_type = TransportType::Air;
        services.manifests.create(&employee(), by_air).await.unwrap();

        let response = as_employee(
            server
                .get("/manifest")
                .add_query_param("transportType", "air")
                .add_query_param("startDate", "2000-01-01T00:00:00Z")
                .add_query_param("endDate", "2999-01-01T00:00:00Z"),
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["transport_type"], "air");

        let response = as_employee(
            server
                .get("/manifest")
                .add_query_param("startDate", "2999-01-01T00:00:00Z"),
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn test_delete_route() {
        let (server, services, _) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let orders = seed_orders(&services, 7301, 1, &blr, &blr).await;
        let manifest = services
            .manifests
            .create(&employee(), new_manifest(&blr, &blr, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(server.delete(&format!("/manifest/{}", manifest.id))).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["deleted"], true);

        let response = as_employee(server.get(&format!("/manifest/{}", manifest.id))).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Delivery run sheets
// =============================================================================

mod drs_tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_order_by_body() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let orders = seed_orders(&services, 7401, 2, &blr, &blr).await;
        let drs = services
            .drs
            .create(&employee(), new_drs(&blr, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(server.delete("/drs/remove-order").json(&json!({
            "drsId": drs.id,
            "orderId": orders[1].id
        })))
        .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["order_ids"], json!([orders[0].id]));
        assert_eq!(order(&store, &orders[1].id).await.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_route_validates_status() {
        let (server, services, store) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let orders = seed_orders(&services, 7501, 1, &blr, &blr).await;
        let drs = services
            .drs
            .create(&employee(), new_drs(&blr, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(server.put(&format!("/drs/{}/status/Lost", drs.id))).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_STATUS");

        let response = as_employee(server.put(&format!("/drs/{}/status/Delivered", drs.id))).await;
        response.assert_status_ok();
        assert_eq!(order(&store, &orders[0].id).await.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (server, services, _) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let orders = seed_orders(&services, 7601, 2, &blr, &blr).await;
        let first = services
            .drs
            .create(&employee(), new_drs(&blr, &[orders[0].id]))
            .await
            .unwrap();
        services
            .drs
            .create(&employee(), new_drs(&blr, &[orders[1].id]))
            .await
            .unwrap();
        services
            .drs
            .update_status(&employee(), &first.id, "Delivered")
            .await
            .unwrap();

        let response =
            as_employee(server.get("/drs").add_query_param("status", "Delivered")).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["code"], "BANA000001");
        assert_eq!(body["data"][0]["hub"]["name"], "Bangalore");
    }

    #[tokio::test]
    async fn test_list_accepts_start_and_end_dates() {
        let (server, services, _) = create_test_server().await;
        let blr = seed_hub(&services, "Bangalore").await;
        let orders = seed_orders(&services, 7651, 1, &blr, &blr).await;
        services
            .drs
            .create(&employee(), new_drs(&blr, &ids(&orders)))
            .await
            .unwrap();

        let response = as_employee(
            server
                .get("/drs")
                .add_query_param("startDate", "2000-01-01T00:00:00Z")
                .add_query_param("endDate", "2999-01-01T00:00:00Z"),
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);

        let response = as_employee(
            server
                .get("/drs")
                .add_query_param("endDate", "2000-01-01T00:00:00Z"),
        )
        .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 0);
    }
}

// =============================================================================
// Batches
// =============================================================================

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove_items() {
        let (server, _, store) = create_test_server().await;
        let parent = Uuid::new_v4();

        let response = as_employee(server.post("/batch").json(&json!([{
            "ordersIDs": [{
                "parent_id": parent,
                "items": [{ "itemId": "B-1" }, { "itemId": "B-2" }]
            }]
        }])))
        .await;
        response.assert_status(StatusCode::CREATED);
        let batch: Value = response.json();
        let id = batch["id"].as_str().unwrap().to_string();

        let response = as_employee(server.delete(&format!("/batch/{id}/items/B-1"))).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["result"], "updated");
        assert_eq!(body["batch"]["groups"][0]["items"][0]["item_id"], "B-2");

        let response = as_employee(server.delete(&format!("/batch/{id}/items/B-2"))).await;
        let body: Value = response.json();
        assert_eq!(body["result"], "deleted");
        assert_eq!(store.batches.count(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_unique_items_is_bad_request() {
        let (server, _, _) = create_test_server().await;
        let payload = json!([{ "parent_id": Uuid::new_v4(), "items": [{ "item_id": "D-1" }] }]);

        as_employee(server.post("/batch").json(&payload))
            .await
            .assert_status(StatusCode::CREATED);

        let response = as_employee(server.post("/batch").json(&payload)).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "NO_UNIQUE_ITEMS");
    }
}
