//! Order records
//!
//! Orders are created by staff and afterwards only change status, either
//! through an aggregate or by being archived. They are never deleted.

use crate::config::PaginationConfig;
use crate::core::auth::{AuthPolicy, Caller};
use crate::core::error::{ConflictError, DocketError, DocketResult, EntityError};
use crate::core::query::{Condition, DocumentQuery, ListParams, PaginatedResponse};
use crate::core::status::OrderStatus;
use crate::entities::{NewOrder, Order};
use crate::lifecycle::projector::Projector;
use crate::storage::Store;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderFilter {
    pub status: Option<String>,
    #[serde(alias = "sourceHubId")]
    pub source_hub_id: Option<Uuid>,
    #[serde(alias = "destinationHubId")]
    pub destination_hub_id: Option<Uuid>,
    #[serde(alias = "docketNumber")]
    pub docket_number: Option<String>,
}

impl OrderFilter {
    pub fn conditions(&self) -> DocketResult<Vec<Condition>> {
        let mut conditions = Vec::new();
        if let Some(status) = &self.status {
            let status: OrderStatus = status.parse()?;
            conditions.push(Condition::eq("status", status.as_str()));
        }
        if let Some(id) = self.source_hub_id {
            conditions.push(Condition::eq("source_hub_id", id.to_string()));
        }
        if let Some(id) = self.destination_hub_id {
            conditions.push(Condition::eq("destination_hub_id", id.to_string()));
        }
        if let Some(docket) = &self.docket_number {
            conditions.push(Condition::eq("docket_number", docket.as_str()));
        }
        Ok(conditions)
    }
}

#[derive(Clone)]
pub struct OrderService {
    store: Store,
    projector: Projector,
    pagination: PaginationConfig,
    /// Serializes the docket uniqueness check with the insert
    create_lock: Arc<Mutex<()>>,
}

impl OrderService {
    pub fn new(store: Store, pagination: PaginationConfig) -> Self {
        Self {
            projector: Projector::new(&store),
            store,
            pagination,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, caller: &Caller, input: NewOrder) -> DocketResult<Order> {
        caller.require(&AuthPolicy::Authenticated)?;
        input.validate()?;
        let docket_number = input.docket_number.clone();

        let _guard = self.create_lock.lock().await;
        let existing = self
            .store
            .orders
            .count(&[Condition::eq("docket_number", docket_number.as_str())])
            .await?;
        if existing > 0 {
            return Err(ConflictError::DuplicateDocket { docket_number }.into());
        }

        let order = match self.store.orders.insert(input.into_order(&caller.id)).await {
            Ok(order) => order,
            // The unique index catches writers outside this process
            Err(err) => {
                return Err(match DocketError::from(err) {
                    DocketError::Entity(EntityError::AlreadyExists { .. }) => {
                        ConflictError::DuplicateDocket { docket_number }.into()
                    }
                    other => other,
                });
            }
        };

        tracing::info!(
            order_id = %order.id,
            docket_number = %order.docket_number,
            items = order.items_count(),
            "order created"
        );
        Ok(order)
    }

    pub async fn get(&self, id: &Uuid) -> DocketResult<Order> {
        self.store
            .orders
            .get(id)
            .await?
            .ok_or_else(|| EntityError::not_found("order", id).into())
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filter: &OrderFilter,
    ) -> DocketResult<PaginatedResponse<Order>> {
        let conditions = filter.conditions()?;
        let page = params.page();
        let limit = params.limit(&self.pagination);

        let total = self.store.orders.count(&conditions).await?;
        let query = DocumentQuery::new()
            .filters(conditions)
            .sort(params.sort())
            .paginate(page, limit);
        let orders = self.store.orders.find(&query).await?;

        Ok(PaginatedResponse::new(orders, page, limit, total))
    }

    /// Move the order to `Archived`; archiving twice changes nothing
    pub async fn archive(&self, caller: &Caller, id: &Uuid) -> DocketResult<Order> {
        caller.require(&AuthPolicy::Authenticated)?;
        let order = self
            .write(id, |order| {
                let changed = order.apply_status(OrderStatus::Archived, None, "Order archived");
                if changed {
                    order.stamp_updated_by(caller);
                }
                changed
            })
            .await?;
        self.projector.sync_snapshots(std::slice::from_ref(&order)).await?;
        tracing::info!(order_id = %id, "order archived");
        Ok(order)
    }

    /// Restore the last status the order had before it was archived
    pub async fn unarchive(&self, caller: &Caller, id: &Uuid) -> DocketResult<Order> {
        caller.require(&AuthPolicy::Authenticated)?;
        let order = self
            .write(id, |order| {
                if order.status != OrderStatus::Archived {
                    return false;
                }
                let restored = order.last_active_status().unwrap_or(OrderStatus::Picked);
                order.apply_status(restored, None, "Order unarchived");
                order.stamp_updated_by(caller);
                true
            })
            .await?;
        self.projector.sync_snapshots(std::slice::from_ref(&order)).await?;
        tracing::info!(order_id = %id, status = %order.status, "order unarchived");
        Ok(order)
    }

    async fn write(
        &self,
        id: &Uuid,
        change: impl Fn(&mut Order) -> bool + Send + Sync,
    ) -> DocketResult<Order> {
        self.store
            .orders
            .modify(id, &change)
            .await?
            .into_inner()
            .ok_or_else(|| EntityError::not_found("order", id).into())
    }
}
