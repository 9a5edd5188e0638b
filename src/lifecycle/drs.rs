//! Delivery run sheet lifecycle
//!
//! A DRS owns the orders of one last-mile round from a single hub. Its
//! status vocabulary is a subset of the order vocabulary, so status
//! changes are propagated to the orders literally.

use crate::config::PaginationConfig;
use crate::core::auth::{AuthPolicy, Caller};
use crate::core::error::{DocketResult, EntityError, ValidationError};
use crate::core::query::{Condition, DocumentQuery, ListParams, PaginatedResponse};
use crate::core::sequence::{CodeGenerator, CodeSeries};
use crate::core::status::DrsStatus;
use crate::entities::{Drs, DrsOrderSummary, DrsUpdate, DrsView, NewDrs};
use crate::lifecycle::membership::{Membership, Slot};
use crate::lifecycle::projector::{DetachReason, Projector};
use crate::lifecycle::{hub_summaries, require_hub, resolve_orders};
use crate::storage::Store;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DrsFilter {
    #[serde(alias = "hubId")]
    pub hub_id: Option<Uuid>,
    #[serde(alias = "deliveryBoyId")]
    pub delivery_boy_id: Option<String>,
    #[serde(alias = "vehicleNumber")]
    pub vehicle_number: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "createdBy")]
    pub created_by: Option<String>,
    #[serde(alias = "updatedBy")]
    pub updated_by: Option<String>,
    #[serde(alias = "startDate")]
    pub from: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    pub to: Option<DateTime<Utc>>,
}

impl DrsFilter {
    pub fn conditions(&self) -> DocketResult<Vec<Condition>> {
        let mut conditions = Vec::new();
        if let Some(hub_id) = self.hub_id {
            conditions.push(Condition::eq("hub_id", hub_id.to_string()));
        }
        if let Some(agent) = &self.delivery_boy_id {
            conditions.push(Condition::eq("delivery_boy_id", agent.as_str()));
        }
        if let Some(vehicle) = self.vehicle_number.as_deref().filter(|v| !v.is_empty()) {
            conditions.push(Condition::contains("vehicle_number", vehicle));
        }
        if let Some(status) = &self.status {
            let status: DrsStatus = status.parse()?;
            conditions.push(Condition::eq("status", status.to_string()));
        }
        if let Some(creator) = &self.created_by {
            conditions.push(Condition::eq("created_by", creator.as_str()));
        }
        if let Some(updater) = &self.updated_by {
            conditions.push(Condition::eq("updated_by", updater.as_str()));
        }
        if let Some(from) = &self.from {
            conditions.push(Condition::since("created_at", from));
        }
        if let Some(to) = &self.to {
            conditions.push(Condition::until("created_at", to));
        }
        Ok(conditions)
    }
}

/// Body of the standalone removal endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveOrderRequest {
    #[serde(alias = "drsId")]
    pub drs_id: Uuid,
    #[serde(alias = "orderId")]
    pub order_id: Uuid,
}

#[derive(Clone)]
pub struct DrsService {
    store: Store,
    projector: Projector,
    membership: Membership,
    codes: CodeGenerator,
    pagination: PaginationConfig,
}

impl DrsService {
    pub fn new(store: Store, codes: CodeGenerator, pagination: PaginationConfig) -> Self {
        Self {
            projector: Projector::new(&store),
            membership: Membership::new(store.orders.clone()),
            store,
            codes,
            pagination,
        }
    }

    pub async fn create(&self, caller: &Caller, input: NewDrs) -> DocketResult<Drs> {
        caller.require(&AuthPolicy::Authenticated)?;
        input.validate()?;
        if input.order_ids.is_empty() {
            return Err(ValidationError::EmptyOrderList {
                aggregate: "drs".to_string(),
            }
            .into());
        }

        let orders = resolve_orders(&self.store, &input.order_ids).await?;
        let hub = require_hub(&self.store, &input.hub_id).await?;
        let code = self.codes.issue(CodeSeries::Drs, &hub.name).await?;

        let mut drs = input.into_drs(code, &caller.id);
        drs.order_ids = orders.iter().map(|order| order.id).collect();
        let drs_id = drs.id;
        let order_ids = drs.order_ids.clone();

        self.membership
            .claim_all(Slot::Drs, drs_id, &order_ids)
            .await?;
        let drs = match self.store.drs.insert(drs).await {
            Ok(drs) => drs,
            Err(err) => {
                self.membership.release_all(Slot::Drs, drs_id, &order_ids).await;
                return Err(err.into());
            }
        };

        let report = self
            .projector
            .advance(&order_ids, drs.status.as_order_status())
            .await?;
        tracing::info!(
            drs_id = %drs.id,
            code = %drs.code,
            order_count = order_ids.len(),
            modified = report.modified,
            "drs created"
        );
        Ok(drs)
    }

    pub async fn get(&self, id: &Uuid) -> DocketResult<DrsView> {
        let drs = self.load(id).await?;
        let mut views = self.populate(vec![drs]).await?;
        views
            .pop()
            .ok_or_else(|| EntityError::not_found("drs", id).into())
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filter: &DrsFilter,
    ) -> DocketResult<PaginatedResponse<DrsView>> {
        let conditions = filter.conditions()?;
        let page = params.page();
        let limit = params.limit(&self.pagination);

        let total = self.store.drs.count(&conditions).await?;
        let query = DocumentQuery::new()
            .filters(conditions)
            .sort(params.sort())
            .paginate(page, limit);
        let sheets = self.store.drs.find(&query).await?;

        Ok(PaginatedResponse::new(
            self.populate(sheets).await?,
            page,
            limit,
            total,
        ))
    }

    /// Replace mutable fields
    ///
    /// A supplied order list replaces the current one and its orders are
    /// advanced to the sheet's status. A supplied status goes through the
    /// same transition as [`DrsService::update_status`], after the other
    /// fields.
    pub async fn update(&self, caller: &Caller, id: &Uuid, update: DrsUpdate) -> DocketResult<Drs> {
        caller.require(&AuthPolicy::Authenticated)?;
        update.validate()?;
        let current = self.load(id).await?;
        if let Some(hub_id) = update.hub_id {
            require_hub(&self.store, &hub_id).await?;
        }

        let status = update.status.filter(|status| *status != current.status);
        let reopening = status.is_some_and(|status| reopens(current.status, status));
        if reopening {
            self.membership
                .claim_all(Slot::Drs, *id, &current.order_ids)
                .await?;
        }

        let drs = match self.replace_fields(caller, &current, &update).await {
            Ok(drs) => drs,
            Err(err) => {
                if reopening {
                    self.membership
                        .release_all(Slot::Drs, *id, &current.order_ids)
                        .await;
                }
                return Err(err);
            }
        };

        match status {
            Some(status) => self.settle_status(caller, drs, status).await,
            None => {
                if drs.status.is_terminal() && update.order_ids.is_some() {
                    self.membership
                        .release_all(Slot::Drs, *id, &drs.order_ids)
                        .await;
                }
                Ok(drs)
            }
        }
    }

    async fn replace_fields(
        &self,
        caller: &Caller,
        current: &Drs,
        update: &DrsUpdate,
    ) -> DocketResult<Drs> {
        let id = &current.id;
        let Some(new_ids) = update.order_ids.clone() else {
            let drs = self
                .write(id, |drs| {
                    update.apply_fields(drs);
                    drs.stamp_updated_by(caller);
                })
                .await?;
            tracing::info!(drs_id = %id, "drs updated");
            return Ok(drs);
        };

        if new_ids.is_empty() {
            return Err(ValidationError::EmptyOrderList {
                aggregate: "drs".to_string(),
            }
            .into());
        }
        let orders = resolve_orders(&self.store, &new_ids).await?;
        let next_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let previous: HashSet<Uuid> = current.order_ids.iter().copied().collect();
        let next: HashSet<Uuid> = next_ids.iter().copied().collect();
        let added: Vec<Uuid> = next_ids
            .iter()
            .copied()
            .filter(|o| !previous.contains(o))
            .collect();
        let dropped: Vec<Uuid> = current
            .order_ids
            .iter()
            .copied()
            .filter(|o| !next.contains(o))
            .collect();

        self.membership.claim_all(Slot::Drs, *id, &added).await?;
        let written = self
            .write(id, |drs| {
                update.apply_fields(drs);
                drs.order_ids = next_ids.clone();
                drs.stamp_updated_by(caller);
            })
            .await;
        let drs = match written {
            Ok(drs) => drs,
            Err(err) => {
                self.membership.release_all(Slot::Drs, *id, &added).await;
                return Err(err);
            }
        };
        self.membership.release_all(Slot::Drs, *id, &dropped).await;

        self.projector
            .advance(&drs.order_ids, drs.status.as_order_status())
            .await?;
        tracing::info!(
            drs_id = %id,
            added = added.len(),
            dropped = dropped.len(),
            "drs orders replaced"
        );
        Ok(drs)
    }

    /// Take one order off the sheet and move it back to `Pending`
    pub async fn remove_order(&self, caller: &Caller, id: &Uuid, order_id: &Uuid) -> DocketResult<Drs> {
        caller.require(&AuthPolicy::Authenticated)?;
        let drs = self.load(id).await?;
        if !drs.contains(order_id) {
            return Err(EntityError::not_found("drs order", order_id).into());
        }

        let drs = self
            .write(id, |drs| {
                drs.remove_order(order_id);
                drs.stamp_updated_by(caller);
            })
            .await?;

        if let Err(err) = self.projector.detach(*id, &[*order_id], DetachReason::FromDrs).await {
            let restored = self
                .store
                .drs
                .modify(id, &|drs: &mut Drs| {
                    if drs.contains(order_id) {
                        return false;
                    }
                    drs.order_ids.push(*order_id);
                    true
                })
                .await;
            if let Err(restore_err) = restored {
                tracing::error!(
                    drs_id = %id,
                    %order_id,
                    error = %restore_err,
                    "failed to restore order after failed detach"
                );
            }
            return Err(err);
        }

        tracing::info!(drs_id = %id, %order_id, "order removed from drs");
        Ok(drs)
    }

    /// Set the sheet status and propagate it to every order as is
    pub async fn update_status(&self, caller: &Caller, id: &Uuid, status: &str) -> DocketResult<Drs> {
        caller.require(&AuthPolicy::Authenticated)?;
        let status: DrsStatus = status.parse()?;
        let current = self.load(id).await?;

        if reopens(current.status, status) {
            self.membership
                .claim_all(Slot::Drs, *id, &current.order_ids)
                .await?;
        }

        self.settle_status(caller, current, status).await
    }

    async fn settle_status(&self, caller: &Caller, current: Drs, status: DrsStatus) -> DocketResult<Drs> {
        let id = current.id;
        let drs = self
            .write(&id, |drs| {
                drs.status = status;
                drs.stamp_updated_by(caller);
            })
            .await?;

        let report = self
            .projector
            .advance(&drs.order_ids, status.as_order_status())
            .await?;
        if status.is_terminal() {
            self.membership
                .release_all(Slot::Drs, id, &drs.order_ids)
                .await;
        }

        tracing::info!(
            drs_id = %id,
            code = %drs.code,
            %status,
            modified = report.modified,
            "drs status changed"
        );
        Ok(drs)
    }

    pub async fn delete(&self, caller: &Caller, id: &Uuid) -> DocketResult<()> {
        caller.require(&AuthPolicy::Authenticated)?;
        let drs = self.load(id).await?;
        if !self.store.drs.delete(id).await? {
            return Err(EntityError::not_found("drs", id).into());
        }
        self.membership
            .release_all(Slot::Drs, *id, &drs.order_ids)
            .await;

        tracing::info!(drs_id = %id, code = %drs.code, "drs deleted");
        Ok(())
    }

    async fn load(&self, id: &Uuid) -> DocketResult<Drs> {
        self.store
            .drs
            .get(id)
            .await?
            .ok_or_else(|| EntityError::not_found("drs", id).into())
    }

    async fn write(&self, id: &Uuid, change: impl Fn(&mut Drs) + Send + Sync) -> DocketResult<Drs> {
        let outcome = self
            .store
            .drs
            .modify(id, &|drs: &mut Drs| {
                change(drs);
                true
            })
            .await?;
        outcome
            .into_inner()
            .ok_or_else(|| EntityError::not_found("drs", id).into())
    }

    async fn populate(&self, sheets: Vec<Drs>) -> DocketResult<Vec<DrsView>> {
        let hub_ids: Vec<Uuid> = sheets.iter().map(|drs| drs.hub_id).collect();
        let hubs = hub_summaries(&self.store, &hub_ids).await?;

        let order_ids: Vec<Uuid> = sheets
            .iter()
            .flat_map(|drs| drs.order_ids.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let orders: HashMap<Uuid, DrsOrderSummary> = self
            .store
            .orders
            .get_many(&order_ids)
            .await?
            .iter()
            .map(|order| (order.id, DrsOrderSummary::from(order)))
            .collect();

        Ok(sheets
            .into_iter()
            .map(|drs| DrsView {
                hub: hubs.get(&drs.hub_id).cloned(),
                orders: drs
                    .order_ids
                    .iter()
                    .filter_map(|id| orders.get(id).cloned())
                    .collect(),
                drs,
            })
            .collect())
    }
}

fn reopens(from: DrsStatus, to: DrsStatus) -> bool {
    from.is_terminal() && !to.is_terminal()
}
