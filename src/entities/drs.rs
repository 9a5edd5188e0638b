//! Delivery run sheets: last-mile delivery rounds from one hub

use crate::core::status::{DrsStatus, OrderStatus};
use crate::entities::hub::HubSummary;
use crate::entities::order::Order;
use crate::{impl_audited, impl_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drs {
    pub id: Uuid,
    pub code: String,
    pub hub_id: Uuid,
    #[serde(default)]
    pub delivery_boy_id: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub status: DrsStatus,
    #[serde(default)]
    pub order_ids: Vec<Uuid>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Drs, "drs", "drs");
impl_audited!(Drs);

impl Drs {
    pub fn contains(&self, order_id: &Uuid) -> bool {
        self.order_ids.contains(order_id)
    }

    /// Drop `order_id` from the sheet; returns whether it was present
    pub fn remove_order(&mut self, order_id: &Uuid) -> bool {
        let before = self.order_ids.len();
        self.order_ids.retain(|id| id != order_id);
        self.order_ids.len() != before
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDrs {
    #[serde(alias = "hubId")]
    pub hub_id: Uuid,
    #[serde(default, alias = "deliveryBoyId")]
    pub delivery_boy_id: Option<String>,
    #[serde(default, alias = "vehicleNumber")]
    #[validate(length(min = 1, message = "vehicle number must not be empty"))]
    pub vehicle_number: Option<String>,
    #[serde(default, alias = "orderIds")]
    pub order_ids: Vec<Uuid>,
}

impl NewDrs {
    pub fn into_drs(self, code: String, created_by: &str) -> Drs {
        let now = Utc::now();
        Drs {
            id: Uuid::new_v4(),
            code,
            hub_id: self.hub_id,
            delivery_boy_id: self.delivery_boy_id,
            vehicle_number: self.vehicle_number,
            status: DrsStatus::OutForDelivery,
            order_ids: self.order_ids,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Replacement of a DRS's mutable fields; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DrsUpdate {
    #[serde(alias = "hubId")]
    pub hub_id: Option<Uuid>,
    #[serde(alias = "deliveryBoyId")]
    pub delivery_boy_id: Option<String>,
    #[serde(alias = "vehicleNumber")]
    #[validate(length(min = 1, message = "vehicle number must not be empty"))]
    pub vehicle_number: Option<String>,
    #[serde(alias = "orderIds")]
    pub order_ids: Option<Vec<Uuid>>,
    pub status: Option<DrsStatus>,
}

impl DrsUpdate {
    /// Apply every scalar field; the order list and the status are
    /// handled by the caller
    pub fn apply_fields(&self, drs: &mut Drs) {
        if let Some(hub_id) = self.hub_id {
            drs.hub_id = hub_id;
        }
        if self.delivery_boy_id.is_some() {
            drs.delivery_boy_id = self.delivery_boy_id.clone();
        }
        if self.vehicle_number.is_some() {
            drs.vehicle_number = self.vehicle_number.clone();
        }
    }
}

/// Order summary embedded in DRS reads
#[derive(Debug, Clone, Serialize)]
pub struct DrsOrderSummary {
    pub id: Uuid,
    pub docket_number: String,
    pub status: OrderStatus,
    pub consignee: Option<String>,
    pub items_count: usize,
    pub total_weight: f64,
}

impl From<&Order> for DrsOrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            docket_number: order.docket_number.clone(),
            status: order.status,
            consignee: order.consignee.display_name().map(str::to_string),
            items_count: order.items_count(),
            total_weight: order.total_weight(),
        }
    }
}

/// DRS as returned by reads, with hub and orders populated
#[derive(Debug, Clone, Serialize)]
pub struct DrsView {
    #[serde(flatten)]
    pub drs: Drs,
    pub hub: Option<HubSummary>,
    pub orders: Vec<DrsOrderSummary>,
}
