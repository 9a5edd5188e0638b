//! Shipment orders and their line items

use crate::core::status::{OrderStatus, TransportType};
use crate::{impl_audited, impl_entity};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;
use validator::Validate;

/// Physical size of one item
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub length: Option<f64>,
}

/// One line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "itemId")]
    pub item_id: String,
    pub weight: f64,
    #[serde(default)]
    pub dimension: Option<Dimension>,
    #[serde(default)]
    pub price: Option<f64>,
    pub status: OrderStatus,
}

/// Inline contact details of a party without a customer record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, alias = "companyName")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

/// Sender or receiver of an order: a customer reference or inline details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Party {
    Customer { customer_id: Uuid },
    Contact(Contact),
}

impl Party {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Party::Customer { .. } => None,
            Party::Contact(contact) => contact
                .name
                .as_deref()
                .or(contact.company_name.as_deref()),
        }
    }
}

impl Default for Party {
    fn default() -> Self {
        Party::Contact(Contact::default())
    }
}

/// One entry of the append-only order history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// A shipment order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub docket_number: String,
    pub transport_type: TransportType,
    pub payment_method: String,
    pub source_hub_id: Uuid,
    pub destination_hub_id: Uuid,
    #[serde(default)]
    pub source_branch_id: Option<Uuid>,
    #[serde(default)]
    pub destination_branch_id: Option<Uuid>,
    #[serde(default)]
    pub consignor: Party,
    #[serde(default)]
    pub consignee: Party,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub picked_vehicle_number: Option<String>,
    /// Manifest the order is currently open in
    #[serde(default)]
    pub manifest_id: Option<Uuid>,
    /// DRS the order is currently open in
    #[serde(default)]
    pub drs_id: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Order, "order", "orders");
impl_audited!(Order);

impl Order {
    /// Move the order and every item to `status`
    ///
    /// Only the order and the items whose status differs are touched, and a
    /// history entry is appended only when something changed. Returns
    /// whether anything changed.
    pub fn apply_status(
        &mut self,
        status: OrderStatus,
        location: Option<&str>,
        details: &str,
    ) -> bool {
        let mut changed = false;

        if self.status != status {
            self.status = status;
            changed = true;
        }
        for item in self.items.iter_mut().filter(|item| item.status != status) {
            item.status = status;
            changed = true;
        }

        if changed {
            self.history.push(HistoryEntry {
                status,
                timestamp: Utc::now(),
                location: location.map(str::to_string),
                details: Some(details.to_string()),
            });
        }
        changed
    }

    /// Most recent status in history other than `Archived`
    pub fn last_active_status(&self) -> Option<OrderStatus> {
        self.history
            .iter()
            .rev()
            .map(|entry| entry.status)
            .find(|status| *status != OrderStatus::Archived)
    }

    pub fn items_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }
}

fn docket_pattern() -> Option<&'static Regex> {
    static DOCKET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    DOCKET_REGEX
        .get_or_init(|| Regex::new(r"^[0-9]{1,20}$").ok())
        .as_ref()
}

fn validate_docket(docket: &str) -> Result<(), validator::ValidationError> {
    if docket_pattern().is_some_and(|re| re.is_match(docket)) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("docket_number")
            .with_message("docket number must be numeric".into()))
    }
}

/// Line item as submitted when an order is created
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOrderItem {
    #[serde(default, alias = "itemId")]
    pub item_id: Option<String>,
    #[validate(range(min = 0.0, message = "weight must not be negative"))]
    pub weight: f64,
    #[serde(default)]
    pub dimension: Option<Dimension>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Payload of order creation
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOrder {
    #[validate(custom(function = "validate_docket"))]
    #[serde(alias = "docketNumber")]
    pub docket_number: String,
    pub transport_type: TransportType,
    #[validate(length(min = 1, message = "payment method is required"))]
    pub payment_method: String,
    pub source_hub_id: Uuid,
    pub destination_hub_id: Uuid,
    #[serde(default)]
    pub source_branch_id: Option<Uuid>,
    #[serde(default)]
    pub destination_branch_id: Option<Uuid>,
    #[serde(default)]
    pub consignor: Party,
    #[serde(default)]
    pub consignee: Party,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub picked_vehicle_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewOrder {
    /// Build the stored order; items without an id get `<docket>-<n>`
    pub fn into_order(self, created_by: &str) -> Order {
        let now = Utc::now();
        let status = OrderStatus::Picked;
        let docket = self.docket_number;

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| OrderItem {
                item_id: item
                    .item_id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("{docket}-{}", index + 1)),
                weight: item.weight,
                dimension: item.dimension,
                price: item.price,
                status,
            })
            .collect();

        Order {
            id: Uuid::new_v4(),
            docket_number: docket,
            transport_type: self.transport_type,
            payment_method: self.payment_method,
            source_hub_id: self.source_hub_id,
            destination_hub_id: self.destination_hub_id,
            source_branch_id: self.source_branch_id,
            destination_branch_id: self.destination_branch_id,
            consignor: self.consignor,
            consignee: self.consignee,
            status,
            items,
            history: vec![HistoryEntry {
                status,
                timestamp: now,
                location: self.location,
                details: Some("Order created".to_string()),
            }],
            picked_vehicle_number: self.picked_vehicle_number,
            manifest_id: None,
            drs_id: None,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
