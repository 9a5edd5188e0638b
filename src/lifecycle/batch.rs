//! Batch lifecycle
//!
//! Batches group order *items* rather than orders. An item id may appear
//! in one batch only; creation keeps the items nobody has batched yet.

use crate::config::PaginationConfig;
use crate::core::auth::{AuthPolicy, Caller};
use crate::core::error::{DocketError, DocketResult, EntityError, ValidationError};
use crate::core::query::{Condition, DocumentQuery, ListParams, PaginatedResponse};
use crate::core::status::OrderStatus;
use crate::entities::batch::{dedup_groups, parse_groups};
use crate::entities::{Batch, BatchGroup};
use crate::storage::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchFilter {
    /// Status of the parent orders
    pub status: Option<String>,
    #[serde(alias = "itemId")]
    pub item_id: Option<String>,
    #[serde(alias = "parentId")]
    pub parent_id: Option<Uuid>,
}

/// Result of removing one item from a batch
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", content = "batch", rename_all = "snake_case")]
pub enum BatchRemoval {
    Updated(Batch),
    /// The item was the last one and the batch is gone
    Deleted,
}

#[derive(Clone)]
pub struct BatchService {
    store: Store,
    pagination: PaginationConfig,
    /// Serializes the dedup scan with the insert that depends on it
    create_lock: Arc<Mutex<()>>,
}

impl BatchService {
    pub fn new(store: Store, pagination: PaginationConfig) -> Self {
        Self {
            store,
            pagination,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, caller: &Caller, payload: Value) -> DocketResult<Batch> {
        caller.require(&AuthPolicy::Authenticated)?;
        let groups = non_empty(parse_groups(payload)?)?;
        let requested: usize = groups.iter().map(|g| g.items.len()).sum();

        let _guard = self.create_lock.lock().await;
        let taken = self.batched_items(None).await?;
        let groups = dedup_groups(groups, &taken);
        if groups.is_empty() {
            return Err(ValidationError::NoUniqueItems.into());
        }

        let batch = self.store.batches.insert(Batch::new(groups, &caller.id)).await?;
        tracing::info!(
            batch_id = %batch.id,
            requested,
            kept = batch.item_ids().count(),
            "batch created"
        );
        Ok(batch)
    }

    pub async fn get(&self, id: &Uuid) -> DocketResult<Batch> {
        self.store
            .batches
            .get(id)
            .await?
            .ok_or_else(|| EntityError::not_found("batch", id).into())
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filter: &BatchFilter,
    ) -> DocketResult<PaginatedResponse<Batch>> {
        let mut conditions = Vec::new();
        if let Some(status) = &filter.status {
            let status: OrderStatus = status.parse()?;
            let orders = self
                .store
                .orders
                .find(&DocumentQuery::new().filter(Condition::eq("status", status.as_str())))
                .await?;
            conditions.push(Condition::In {
                field: "groups.parent_id".to_string(),
                values: orders
                    .iter()
                    .map(|order| Value::String(order.id.to_string()))
                    .collect(),
            });
        }
        if let Some(item_id) = &filter.item_id {
            conditions.push(Condition::eq("groups.items.item_id", item_id.as_str()));
        }
        if let Some(parent_id) = filter.parent_id {
            conditions.push(Condition::eq("groups.parent_id", parent_id.to_string()));
        }

        let page = params.page();
        let limit = params.limit(&self.pagination);
        let total = self.store.batches.count(&conditions).await?;
        let query = DocumentQuery::new()
            .filters(conditions)
            .sort(params.sort())
            .paginate(page, limit);
        let batches = self.store.batches.find(&query).await?;

        Ok(PaginatedResponse::new(batches, page, limit, total))
    }

    /// Replace the groups of a batch
    ///
    /// Items already held by other batches are dropped, as on create.
    pub async fn update(&self, caller: &Caller, id: &Uuid, payload: Value) -> DocketResult<Batch> {
        caller.require(&AuthPolicy::Authenticated)?;
        let groups = non_empty(parse_groups(payload)?)?;

        let _guard = self.create_lock.lock().await;
        let taken = self.batched_items(Some(id)).await?;
        let groups = dedup_groups(groups, &taken);
        if groups.is_empty() {
            return Err(ValidationError::NoUniqueItems.into());
        }

        let outcome = self
            .store
            .batches
            .modify(id, &|batch: &mut Batch| {
                batch.groups = groups.clone();
                batch.stamp_updated_by(caller);
                true
            })
            .await?;
        let batch = outcome
            .into_inner()
            .ok_or_else(|| DocketError::from(EntityError::not_found("batch", id)))?;

        tracing::info!(batch_id = %id, items = batch.item_ids().count(), "batch updated");
        Ok(batch)
    }

    pub async fn delete(&self, caller: &Caller, id: &Uuid) -> DocketResult<()> {
        caller.require(&AuthPolicy::Authenticated)?;
        if !self.store.batches.delete(id).await? {
            return Err(EntityError::not_found("batch", id).into());
        }
        tracing::info!(batch_id = %id, "batch deleted");
        Ok(())
    }

    /// Remove one item; a batch left without items is deleted
    pub async fn remove_item(
        &self,
        caller: &Caller,
        id: &Uuid,
        item_id: &str,
    ) -> DocketResult<BatchRemoval> {
        caller.require(&AuthPolicy::Authenticated)?;
        let batch = self.get(id).await?;
        if !batch.item_ids().any(|existing| existing == item_id) {
            return Err(EntityError::not_found("batch item", item_id).into());
        }

        let outcome = self
            .store
            .batches
            .modify(id, &|batch: &mut Batch| {
                let removed = batch.remove_item(item_id);
                if removed {
                    batch.stamp_updated_by(caller);
                }
                removed
            })
            .await?;
        let batch = outcome
            .into_inner()
            .ok_or_else(|| DocketError::from(EntityError::not_found("batch", id)))?;

        if batch.is_empty() {
            self.store.batches.delete(id).await?;
            tracing::info!(batch_id = %id, %item_id, "last item removed, batch deleted");
            return Ok(BatchRemoval::Deleted);
        }

        tracing::info!(batch_id = %id, %item_id, "item removed from batch");
        Ok(BatchRemoval::Updated(batch))
    }

    /// Every item id held by a batch other than `except`
    async fn batched_items(&self, except: Option<&Uuid>) -> DocketResult<HashSet<String>> {
        let batches = self.store.batches.find(&DocumentQuery::new()).await?;
        Ok(batches
            .iter()
            .filter(|batch| Some(&batch.id) != except)
            .flat_map(|batch| batch.item_ids().map(str::to_string))
            .collect())
    }
}

fn non_empty(groups: Vec<BatchGroup>) -> DocketResult<Vec<BatchGroup>> {
    if groups.iter().all(|group| group.items.is_empty()) {
        return Err(ValidationError::field("body", "batch payload has no items").into());
    }
    Ok(groups)
}
