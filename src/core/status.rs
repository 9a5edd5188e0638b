//! Status vocabularies for orders and their aggregates
//!
//! Order and item statuses share one vocabulary. Manifest and DRS statuses
//! are separate, smaller vocabularies that the lifecycle services translate
//! into order statuses.

use crate::core::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Status of an order or of one of its line items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Picked,
    ReachedSourceBranch,
    ReachedSourceHub,
    InTransit,
    ReachedDestinationHub,
    ReachedDestinationBranch,
    Pending,
    OutForDelivery,
    Delivered,
    Cancelled,
    Manifested,
    Rto,
    Archived,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 13] = [
        OrderStatus::Picked,
        OrderStatus::ReachedSourceBranch,
        OrderStatus::ReachedSourceHub,
        OrderStatus::InTransit,
        OrderStatus::ReachedDestinationHub,
        OrderStatus::ReachedDestinationBranch,
        OrderStatus::Pending,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Manifested,
        OrderStatus::Rto,
        OrderStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Picked => "Picked",
            OrderStatus::ReachedSourceBranch => "Reached Source Branch",
            OrderStatus::ReachedSourceHub => "Reached Source Hub",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::ReachedDestinationHub => "Reached Destination Hub",
            OrderStatus::ReachedDestinationBranch => "Reached Destination Branch",
            OrderStatus::Pending => "Pending",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Manifested => "Manifested",
            OrderStatus::Rto => "RTO",
            OrderStatus::Archived => "Archived",
        }
    }
}

/// Lowercase with underscores folded to spaces, so `Out_For_Delivery`
/// and `Out for Delivery` name the same status.
fn normalize(value: &str) -> String {
    value.trim().replace('_', " ").to_lowercase()
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        OrderStatus::ALL
            .into_iter()
            .find(|status| normalize(status.as_str()) == wanted)
            .ok_or_else(|| ValidationError::InvalidStatus {
                kind: "order".to_string(),
                value: s.to_string(),
            })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Aggregate status of a manifest
///
/// The three known statuses drive order projection. Any other value is
/// stored as given and has no effect on the contained orders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ManifestStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
    Other(String),
}

impl ManifestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ManifestStatus::Pending => "Pending",
            ManifestStatus::InTransit => "In Transit",
            ManifestStatus::Delivered => "Delivered",
            ManifestStatus::Other(value) => value,
        }
    }

    /// Order status the contained orders move to, if any
    pub fn order_effect(&self) -> Option<OrderStatus> {
        match self {
            ManifestStatus::InTransit => Some(OrderStatus::InTransit),
            // Last-mile delivery belongs to the DRS
            ManifestStatus::Delivered => Some(OrderStatus::ReachedDestinationHub),
            ManifestStatus::Pending => Some(OrderStatus::Manifested),
            ManifestStatus::Other(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ManifestStatus::Delivered)
    }
}

impl From<String> for ManifestStatus {
    fn from(value: String) -> Self {
        match normalize(&value).as_str() {
            "pending" => ManifestStatus::Pending,
            "in transit" => ManifestStatus::InTransit,
            "delivered" => ManifestStatus::Delivered,
            _ => ManifestStatus::Other(value),
        }
    }
}

impl From<ManifestStatus> for String {
    fn from(status: ManifestStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status of a delivery run sheet
///
/// Names match the order vocabulary, so a DRS status is propagated to its
/// orders literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrsStatus {
    #[default]
    OutForDelivery,
    Delivered,
}

impl DrsStatus {
    pub fn as_order_status(&self) -> OrderStatus {
        match self {
            DrsStatus::OutForDelivery => OrderStatus::OutForDelivery,
            DrsStatus::Delivered => OrderStatus::Delivered,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DrsStatus::Delivered)
    }
}

impl FromStr for DrsStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "out for delivery" => Ok(DrsStatus::OutForDelivery),
            "delivered" => Ok(DrsStatus::Delivered),
            _ => Err(ValidationError::InvalidStatus {
                kind: "drs".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DrsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_order_status().as_str())
    }
}

impl Serialize for DrsStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_order_status().as_str())
    }
}

impl<'de> Deserialize<'de> for DrsStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Mode of an order or manifest leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Air,
    Surface,
    Train,
    Sea,
}

/// Operational status of a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HubStatus {
    #[default]
    Active,
    Inactive,
}
