//! Hub records; every mutation is reserved to super admins

use crate::config::PaginationConfig;
use crate::core::auth::{AuthPolicy, Caller};
use crate::core::error::{DocketResult, EntityError};
use crate::core::query::{Condition, DocumentQuery, ListParams, PaginatedResponse};
use crate::core::status::HubStatus;
use crate::entities::{Hub, HubUpdate, NewHub};
use crate::storage::Store;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HubFilter {
    pub status: Option<HubStatus>,
    /// Case-insensitive substring of the name
    pub name: Option<String>,
}

impl HubFilter {
    pub fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(status) = self.status {
            conditions.push(Condition::eq("status", serde_json::json!(status)));
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            conditions.push(Condition::contains("name", name));
        }
        conditions
    }
}

#[derive(Clone)]
pub struct HubService {
    store: Store,
    pagination: PaginationConfig,
}

impl HubService {
    pub fn new(store: Store, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    pub async fn create(&self, caller: &Caller, input: NewHub) -> DocketResult<Hub> {
        caller.require(&AuthPolicy::SuperAdminOnly)?;
        input.validate()?;

        let hub = self.store.hubs.insert(input.into_hub(&caller.id)).await?;
        tracing::info!(hub_id = %hub.id, name = %hub.name, "hub created");
        Ok(hub)
    }

    pub async fn get(&self, id: &Uuid) -> DocketResult<Hub> {
        self.store
            .hubs
            .get(id)
            .await?
            .ok_or_else(|| EntityError::not_found("hub", id).into())
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filter: &HubFilter,
    ) -> DocketResult<PaginatedResponse<Hub>> {
        let conditions = filter.conditions();
        let page = params.page();
        let limit = params.limit(&self.pagination);

        let total = self.store.hubs.count(&conditions).await?;
        let query = DocumentQuery::new()
            .filters(conditions)
            .sort(params.sort())
            .paginate(page, limit);
        let hubs = self.store.hubs.find(&query).await?;

        Ok(PaginatedResponse::new(hubs, page, limit, total))
    }

    pub async fn update(&self, caller: &Caller, id: &Uuid, update: HubUpdate) -> DocketResult<Hub> {
        caller.require(&AuthPolicy::SuperAdminOnly)?;
        update.validate()?;

        let hub = self
            .write(id, |hub| {
                update.clone().apply(hub);
                hub.stamp_updated_by(caller);
                true
            })
            .await?;
        tracing::info!(hub_id = %id, "hub updated");
        Ok(hub)
    }

    pub async fn archive(&self, caller: &Caller, id: &Uuid) -> DocketResult<Hub> {
        self.set_status(caller, id, HubStatus::Inactive).await
    }

    pub async fn unarchive(&self, caller: &Caller, id: &Uuid) -> DocketResult<Hub> {
        self.set_status(caller, id, HubStatus::Active).await
    }

    pub async fn delete(&self, caller: &Caller, id: &Uuid) -> DocketResult<()> {
        caller.require(&AuthPolicy::SuperAdminOnly)?;
        if !self.store.hubs.delete(id).await? {
            return Err(EntityError::not_found("hub", id).into());
        }
        tracing::info!(hub_id = %id, "hub deleted");
        Ok(())
    }

    async fn set_status(&self, caller: &Caller, id: &Uuid, status: HubStatus) -> DocketResult<Hub> {
        caller.require(&AuthPolicy::SuperAdminOnly)?;
        let hub = self
            .write(id, |hub| {
                if hub.status == status {
                    return false;
                }
                hub.status = status;
                hub.stamp_updated_by(caller);
                true
            })
            .await?;
        tracing::info!(hub_id = %id, status = ?hub.status, "hub status changed");
        Ok(hub)
    }

    async fn write(
        &self,
        id: &Uuid,
        change: impl Fn(&mut Hub) -> bool + Send + Sync,
    ) -> DocketResult<Hub> {
        self.store
            .hubs
            .modify(id, &change)
            .await?
            .into_inner()
            .ok_or_else(|| EntityError::not_found("hub", id).into())
    }
}
