//! Hubs: regional sorting facilities

use crate::core::status::HubStatus;
use crate::{impl_audited, impl_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    pub id: Uuid,
    /// Its first three letters prefix every manifest and DRS code of the hub
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub hub_code: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub pincodes: Vec<u32>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub landline_number: Option<String>,
    #[serde(default)]
    pub status: HubStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Hub, "hub", "hubs");
impl_audited!(Hub);

/// Reference to a hub embedded in read responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubSummary {
    pub id: Uuid,
    pub name: String,
    pub hub_code: Option<String>,
}

impl From<&Hub> for HubSummary {
    fn from(hub: &Hub) -> Self {
        Self {
            id: hub.id,
            name: hub.name.clone(),
            hub_code: hub.hub_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewHub {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[serde(default)]
    pub hub_code: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub pincodes: Vec<u32>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub landline_number: Option<String>,
}

impl NewHub {
    pub fn into_hub(self, created_by: &str) -> Hub {
        let now = Utc::now();
        Hub {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            address: self.address,
            hub_code: self.hub_code,
            division: self.division,
            pincodes: self.pincodes,
            manager_id: self.manager_id,
            landline_number: self.landline_number,
            status: HubStatus::Active,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a hub; absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct HubUpdate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: Option<String>,
    pub hub_code: Option<String>,
    pub division: Option<String>,
    pub pincodes: Option<Vec<u32>>,
    pub manager_id: Option<String>,
    pub landline_number: Option<String>,
}

impl HubUpdate {
    pub fn apply(self, hub: &mut Hub) {
        if let Some(name) = self.name {
            hub.name = name.trim().to_string();
        }
        if let Some(address) = self.address {
            hub.address = address;
        }
        if self.hub_code.is_some() {
            hub.hub_code = self.hub_code;
        }
        if self.division.is_some() {
            hub.division = self.division;
        }
        if let Some(pincodes) = self.pincodes {
            hub.pincodes = pincodes;
        }
        if self.manager_id.is_some() {
            hub.manager_id = self.manager_id;
        }
        if self.landline_number.is_some() {
            hub.landline_number = self.landline_number;
        }
    }
}
