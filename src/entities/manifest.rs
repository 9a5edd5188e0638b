//! Manifests: orders travelling together on one inter-hub leg

use crate::core::status::{ManifestStatus, TransportType};
use crate::entities::hub::HubSummary;
use crate::entities::order::{Order, OrderItem};
use crate::{impl_audited, impl_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Read-side copy of an order embedded in a manifest
///
/// The canonical data lives on the order; snapshots are rebuilt from it
/// after every status propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestOrder {
    pub order_id: Uuid,
    pub docket_number: String,
    pub items_count: usize,
    pub total_weight: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl From<&Order> for ManifestOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            docket_number: order.docket_number.clone(),
            items_count: order.items_count(),
            total_weight: order.total_weight(),
            items: order.items.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub code: String,
    pub source_hub_id: Uuid,
    pub destination_hub_id: Uuid,
    #[serde(default)]
    pub loader_id: Option<String>,
    pub vehicle_number: String,
    #[serde(default)]
    pub gps_location: Option<String>,
    #[serde(default)]
    pub driver_contact_number: Option<String>,
    #[serde(default)]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub transport_type: TransportType,
    #[serde(default)]
    pub orders: Vec<ManifestOrder>,
    #[serde(default)]
    pub individual_orders: usize,
    #[serde(default)]
    pub total_pieces: usize,
    #[serde(default)]
    pub total_weight: f64,
    #[serde(default)]
    pub actual_weight: Option<f64>,
    #[serde(default)]
    pub status: ManifestStatus,
    #[serde(default)]
    pub issue_status: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Manifest, "manifest", "manifests");
impl_audited!(Manifest);

impl Manifest {
    pub fn order_ids(&self) -> Vec<Uuid> {
        self.orders.iter().map(|entry| entry.order_id).collect()
    }

    pub fn contains(&self, order_id: &Uuid) -> bool {
        self.orders.iter().any(|entry| entry.order_id == *order_id)
    }

    /// Drop `order_id` from the manifest; returns whether it was present
    pub fn remove_order(&mut self, order_id: &Uuid) -> bool {
        let before = self.orders.len();
        self.orders.retain(|entry| entry.order_id != *order_id);
        let removed = self.orders.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /// Rebuild snapshots from canonical orders and recompute totals
    ///
    /// Entries whose order is not among `orders` keep their last snapshot.
    /// Returns whether anything changed.
    pub fn refresh_snapshots(&mut self, orders: &[Order]) -> bool {
        let mut changed = false;
        for entry in self.orders.iter_mut() {
            if let Some(order) = orders.iter().find(|order| order.id == entry.order_id) {
                let fresh = ManifestOrder::from(order);
                if *entry != fresh {
                    *entry = fresh;
                    changed = true;
                }
            }
        }
        self.recompute_totals() || changed
    }

    /// Recompute aggregate totals; returns whether any of them moved
    pub fn recompute_totals(&mut self) -> bool {
        let individual_orders = self.orders.len();
        let total_pieces = self.orders.iter().map(|entry| entry.items_count).sum();
        let total_weight = self.orders.iter().map(|entry| entry.total_weight).sum();

        let changed = self.individual_orders != individual_orders
            || self.total_pieces != total_pieces
            || self.total_weight != total_weight;

        self.individual_orders = individual_orders;
        self.total_pieces = total_pieces;
        self.total_weight = total_weight;
        changed
    }
}

/// Payload of manifest creation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewManifest {
    #[serde(alias = "sourceHubID")]
    pub source_hub_id: Uuid,
    #[serde(alias = "destinationHubID")]
    pub destination_hub_id: Uuid,
    #[serde(default, alias = "loaderId")]
    pub loader_id: Option<String>,
    #[serde(alias = "vehicleNumber")]
    #[validate(length(min = 1, message = "vehicle number is required"))]
    pub vehicle_number: String,
    #[serde(default, alias = "gpsLocation")]
    pub gps_location: Option<String>,
    #[serde(default, alias = "driverContactNumber")]
    pub driver_contact_number: Option<String>,
    #[serde(default, alias = "estimatedDeliveryDate")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub transport_type: TransportType,
    #[serde(default, alias = "orderIDs")]
    pub order_ids: Vec<Uuid>,
    #[serde(default, alias = "actualWeight")]
    #[validate(range(min = 0.0, message = "actual weight must not be negative"))]
    pub actual_weight: Option<f64>,
    #[serde(default, alias = "issueStatus")]
    pub issue_status: Option<String>,
}

impl NewManifest {
    /// Build the stored manifest from the already-resolved orders
    pub fn into_manifest(self, code: String, orders: &[Order], created_by: &str) -> Manifest {
        let now = Utc::now();
        let mut manifest = Manifest {
            id: Uuid::new_v4(),
            code,
            source_hub_id: self.source_hub_id,
            destination_hub_id: self.destination_hub_id,
            loader_id: self.loader_id,
            vehicle_number: self.vehicle_number,
            gps_location: self.gps_location,
            driver_contact_number: self.driver_contact_number,
            estimated_delivery_date: self.estimated_delivery_date,
            transport_type: self.transport_type,
            orders: orders.iter().map(ManifestOrder::from).collect(),
            individual_orders: 0,
            total_pieces: 0,
            total_weight: 0.0,
            actual_weight: self.actual_weight,
            status: ManifestStatus::Pending,
            issue_status: self.issue_status,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        manifest.recompute_totals();
        manifest
    }
}

/// Replacement of a manifest's mutable fields; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ManifestUpdate {
    #[serde(alias = "sourceHubID")]
    pub source_hub_id: Option<Uuid>,
    #[serde(alias = "destinationHubID")]
    pub destination_hub_id: Option<Uuid>,
    #[serde(alias = "loaderId")]
    pub loader_id: Option<String>,
    #[serde(alias = "vehicleNumber")]
    #[validate(length(min = 1, message = "vehicle number must not be empty"))]
    pub vehicle_number: Option<String>,
    #[serde(alias = "gpsLocation")]
    pub gps_location: Option<String>,
    #[serde(alias = "driverContactNumber")]
    pub driver_contact_number: Option<String>,
    #[serde(alias = "estimatedDeliveryDate")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub transport_type: Option<TransportType>,
    #[serde(alias = "orderIDs")]
    pub order_ids: Option<Vec<Uuid>>,
    pub status: Option<ManifestStatus>,
    #[serde(alias = "actualWeight")]
    pub actual_weight: Option<f64>,
    #[serde(alias = "issueStatus")]
    pub issue_status: Option<String>,
}

impl ManifestUpdate {
    /// Apply every scalar field; the order list and the status are
    /// handled by the caller, which owns their effect on the orders
    pub fn apply_fields(&self, manifest: &mut Manifest) {
        if let Some(id) = self.source_hub_id {
            manifest.source_hub_id = id;
        }
        if let Some(id) = self.destination_hub_id {
            manifest.destination_hub_id = id;
        }
        if self.loader_id.is_some() {
            manifest.loader_id = self.loader_id.clone();
        }
        if let Some(vehicle) = &self.vehicle_number {
            manifest.vehicle_number = vehicle.clone();
        }
        if self.gps_location.is_some() {
            manifest.gps_location = self.gps_location.clone();
        }
        if self.driver_contact_number.is_some() {
            manifest.driver_contact_number = self.driver_contact_number.clone();
        }
        if self.estimated_delivery_date.is_some() {
            manifest.estimated_delivery_date = self.estimated_delivery_date;
        }
        if let Some(transport) = self.transport_type {
            manifest.transport_type = transport;
        }
        if self.actual_weight.is_some() {
            manifest.actual_weight = self.actual_weight;
        }
        if self.issue_status.is_some() {
            manifest.issue_status = self.issue_status.clone();
        }
    }
}

/// Manifest as returned by reads, with referenced hubs populated
#[derive(Debug, Clone, Serialize)]
pub struct ManifestView {
    #[serde(flatten)]
    pub manifest: Manifest,
    pub source_hub: Option<HubSummary>,
    pub destination_hub: Option<HubSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::OrderStatus;
    use crate::entities::order::NewOrder;
    use serde_json::json;

    fn order(docket: &str, weights: &[f64]) -> Order {
        let items: Vec<_> = weights.iter().map(|w| json!({ "weight": w })).collect();
        serde_json::from_value::<NewOrder>(json!({
            "docket_number": docket,
            "transport_type": "air",
            "payment_method": "cod",
            "source_hub_id": Uuid::new_v4(),
            "destination_hub_id": Uuid::new_v4(),
            "items": items
        }))
        .unwrap()
        .into_order("emp-1")
    }

    fn manifest(orders: &[Order]) -> Manifest {
        serde_json::from_value::<NewManifest>(json!({
            "sourceHubID": Uuid::new_v4(),
            "destinationHubID": Uuid::new_v4(),
            "vehicleNumber": "KA01AB1234",
            "transport_type": "surface",
            "orderIDs": orders.iter().map(|o| o.id).collect::<Vec<_>>()
        }))
        .unwrap()
        .into_manifest("BLRA000001".to_string(), orders, "emp-1")
    }

    #[test]
    fn test_totals_on_creation() {
        let orders = vec![order("1", &[1.0, 2.0]), order("2", &[4.5])];
        let manifest = manifest(&orders);
        assert_eq!(manifest.individual_orders, 2);
        assert_eq!(manifest.total_pieces, 3);
        assert_eq!(manifest.total_weight, 7.5);
        assert_eq!(manifest.status, ManifestStatus::Pending);
    }

    #[test]
    fn test_refresh_snapshots_follows_canonical_orders() {
        let mut orders = vec![order("1", &[1.0]), order("2", &[2.0])];
        let mut manifest = manifest(&orders);
        assert!(!manifest.refresh_snapshots(&orders));

        orders[0].apply_status(OrderStatus::InTransit, None, "moving");
        assert!(manifest.refresh_snapshots(&orders));
        assert_eq!(manifest.orders[0].items[0].status, OrderStatus::InTransit);
        assert_eq!(manifest.orders[1].items[0].status, OrderStatus::Picked);
    }

    #[test]
    fn test_remove_order_updates_totals() {
        let orders = vec![order("1", &[1.0]), order("2", &[2.0])];
        let mut manifest = manifest(&orders);

        assert!(manifest.remove_order(&orders[0].id));
        assert!(!manifest.remove_order(&orders[0].id));
        assert_eq!(manifest.order_ids(), vec![orders[1].id]);
        assert_eq!(manifest.total_weight, 2.0);
    }

    #[test]
    fn test_update_applies_present_fields_but_not_status() {
        let orders = vec![order("1", &[1.0])];
        let mut manifest = manifest(&orders);
        let update: ManifestUpdate =
            serde_json::from_value(json!({ "vehicleNumber": "MH12XY0001", "status": "In Transit" }))
                .unwrap();

        update.apply_fields(&mut manifest);

        assert_eq!(manifest.vehicle_number, "MH12XY0001");
        assert_eq!(manifest.status, ManifestStatus::Pending);
        assert_eq!(update.status, Some(ManifestStatus::InTransit));
        assert_eq!(manifest.transport_type, TransportType::Surface);
    }
}
