//! Manifest lifecycle
//!
//! A manifest owns the orders of one transport leg between two hubs.
//! Creation claims every order for the manifest, writes the manifest with
//! a code issued from the source hub's series, then advances the orders to
//! `Manifested`. Status changes are translated for the orders:
//!
//! | Manifest     | Orders                    |
//! |--------------|---------------------------|
//! | `In Transit` | `In Transit`              |
//! | `Delivered`  | `Reached Destination Hub` |
//! | `Pending`    | `Manifested`              |
//! | anything else | unchanged                |
//!
//! After every propagation the embedded order snapshots are rebuilt from
//! the canonical orders.

use crate::config::PaginationConfig;
use crate::core::auth::{AuthPolicy, Caller};
use crate::core::error::{DocketResult, EntityError, ValidationError};
use crate::core::query::{Condition, DocumentQuery, ListParams, PaginatedResponse};
use crate::core::sequence::{CodeGenerator, CodeSeries};
use crate::core::service::Modified;
use crate::core::status::{ManifestStatus, OrderStatus, TransportType};
use crate::entities::{
    HubSummary, Manifest, ManifestOrder, ManifestUpdate, ManifestView, NewManifest, Order,
};
use crate::lifecycle::membership::{Membership, Slot};
use crate::lifecycle::projector::{DetachReason, Projector};
use crate::lifecycle::{hub_summaries, require_hub, resolve_orders};
use crate::storage::Store;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

/// Filters of the manifest list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestFilter {
    #[serde(alias = "sourceHubID")]
    pub source_hub_id: Option<Uuid>,
    #[serde(alias = "destinationHubID")]
    pub destination_hub_id: Option<Uuid>,
    /// Case-insensitive substring of the vehicle number
    #[serde(alias = "vehicleNumber")]
    pub vehicle_number: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "transportType")]
    pub transport_type: Option<TransportType>,
    #[serde(alias = "createdBy")]
    pub created_by: Option<String>,
    #[serde(alias = "updatedBy")]
    pub updated_by: Option<String>,
    /// Created at or after
    #[serde(alias = "startDate")]
    pub from: Option<DateTime<Utc>>,
    /// Created at or before
    #[serde(alias = "endDate")]
    pub to: Option<DateTime<Utc>>,
}

impl ManifestFilter {
    pub fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(id) = self.source_hub_id {
            conditions.push(Condition::eq("source_hub_id", id.to_string()));
        }
        if let Some(id) = self.destination_hub_id {
            conditions.push(Condition::eq("destination_hub_id", id.to_string()));
        }
        if let Some(vehicle) = self.vehicle_number.as_deref().filter(|v| !v.is_empty()) {
            conditions.push(Condition::contains("vehicle_number", vehicle));
        }
        if let Some(status) = &self.status {
            let status = ManifestStatus::from(status.clone());
            conditions.push(Condition::eq("status", status.as_str()));
        }
        if let Some(transport) = self.transport_type {
            conditions.push(Condition::Eq {
                field: "transport_type".to_string(),
                value: serde_json::json!(transport),
            });
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
        conditions
    }
}

#[derive(Clone)]
pub struct ManifestService {
    store: Store,
    projector: Projector,
    membership: Membership,
    codes: CodeGenerator,
    pagination: PaginationConfig,
}

impl ManifestService {
    pub fn new(store: Store, codes: CodeGenerator, pagination: PaginationConfig) -> Self {
        Self {
            projector: Projector::new(&store),
            membership: Membership::new(store.orders.clone()),
            store,
            codes,
            pagination,
        }
    }

    pub async fn create(&self, caller: &Caller, input: NewManifest) -> DocketResult<Manifest> {
        caller.require(&AuthPolicy::Authenticated)?;
        input.validate()?;
        if input.order_ids.is_empty() {
            return Err(ValidationError::EmptyOrderList {
                aggregate: "manifest".to_string(),
            }
            .into());
        }

        let orders = resolve_orders(&self.store, &input.order_ids).await?;
        let source = require_hub(&self.store, &input.source_hub_id).await?;
        require_hub(&self.store, &input.destination_hub_id).await?;

        let code = self.codes.issue(CodeSeries::Manifest, &source.name).await?;
        let manifest = input.into_manifest(code, &orders, &caller.id);
        let manifest_id = manifest.id;
        let order_ids = manifest.order_ids();

        self.membership
            .claim_all(Slot::Manifest, manifest_id, &order_ids)
            .await?;
        let manifest = match self.store.manifests.insert(manifest).await {
            Ok(manifest) => manifest,
            Err(err) => {
                self.membership
                    .release_all(Slot::Manifest, manifest_id, &order_ids)
                    .await;
                return Err(err.into());
            }
        };

        tracing::info!(
            manifest_id = %manifest.id,
            code = %manifest.code,
            order_count = order_ids.len(),
            "manifest created"
        );

        self.propagate(manifest, OrderStatus::Manifested).await
    }

    pub async fn get(&self, id: &Uuid) -> DocketResult<ManifestView> {
        let manifest = self.load(id).await?;
        let mut views = self.populate(vec![manifest]).await?;
        views
            .pop()
            .ok_or_else(|| EntityError::not_found("manifest", id).into())
    }

    pub async fn list(
        &self,
        params: &ListParams,
        filter: &ManifestFilter,
    ) -> DocketResult<PaginatedResponse<ManifestView>> {
        let conditions = filter.conditions();
        let page = params.page();
        let limit = params.limit(&self.pagination);

        let total = self.store.manifests.count(&conditions).await?;
        let query = DocumentQuery::new()
            .filters(conditions)
            .sort(params.sort())
            .paginate(page, limit);
        let manifests = self.store.manifests.find(&query).await?;

        Ok(PaginatedResponse::new(
            self.populate(manifests).await?,
            page,
            limit,
            total,
        ))
    }

    /// Replace mutable fields
    ///
    /// A supplied order list replaces the current one: new orders are
    /// claimed, dropped orders are released, and every listed order is
    /// advanced to `Manifested`. Dropped orders keep their status. A
    /// supplied status goes through the same transition as
    /// [`ManifestService::update_status`], after the other fields.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &Uuid,
        update: ManifestUpdate,
    ) -> DocketResult<Manifest> {
        caller.require(&AuthPolicy::Authenticated)?;
        update.validate()?;
        let current = self.load(id).await?;

        if let Some(hub_id) = update.source_hub_id {
            require_hub(&self.store, &hub_id).await?;
        }
        if let Some(hub_id) = update.destination_hub_id {
            require_hub(&self.store, &hub_id).await?;
        }

        let status = match &update.status {
            Some(status) if *status != current.status => Some(checked_status(status.clone())?),
            _ => None,
        };
        let reopening = status
            .as_ref()
            .is_some_and(|status| reopens(&current.status, status));
        if reopening {
            self.membership
                .claim_all(Slot::Manifest, *id, &current.order_ids())
                .await?;
        }

        let manifest = match self.replace_fields(caller, &current, &update).await {
            Ok(manifest) => manifest,
            Err(err) => {
                if reopening {
                    self.membership
                        .release_all(Slot::Manifest, *id, &current.order_ids())
                        .await;
                }
                return Err(err);
            }
        };

        match status {
            Some(status) => self.settle_status(caller, manifest, status).await,
            None => {
                // A delivered manifest holds no claims, not even on orders just added
                if manifest.status.is_terminal() && update.order_ids.is_some() {
                    self.membership
                        .release_all(Slot::Manifest, *id, &manifest.order_ids())
                        .await;
                }
                Ok(manifest)
            }
        }
    }

    /// Write every field of `update` except the status
    async fn replace_fields(
        &self,
        caller: &Caller,
        current: &Manifest,
        update: &ManifestUpdate,
    ) -> DocketResult<Manifest> {
        let id = &current.id;
        let Some(new_ids) = update.order_ids.clone() else {
            let manifest = self
                .write(id, |manifest| {
                    update.apply_fields(manifest);
                    manifest.stamp_updated_by(caller);
                })
                .await?;
            tracing::info!(manifest_id = %id, "manifest updated");
            return Ok(manifest);
        };

        if new_ids.is_empty() {
            return Err(ValidationError::EmptyOrderList {
                aggregate: "manifest".to_string(),
            }
            .into());
        }
        let orders = resolve_orders(&self.store, &new_ids).await?;
        let previous: HashSet<Uuid> = current.order_ids().into_iter().collect();
        let next: HashSet<Uuid> = orders.iter().map(|o| o.id).collect();
        let added: Vec<Uuid> = orders
            .iter()
            .map(|o| o.id)
            .filter(|o| !previous.contains(o))
            .collect();
        let dropped: Vec<Uuid> = current
            .order_ids()
            .into_iter()
            .filter(|o| !next.contains(o))
            .collect();

        self.membership
            .claim_all(Slot::Manifest, *id, &added)
            .await?;

        let snapshots: Vec<ManifestOrder> = orders.iter().map(ManifestOrder::from).collect();
        let written = self
            .write(id, |manifest| {
                update.apply_fields(manifest);
                manifest.orders = snapshots.clone();
                manifest.recompute_totals();
                manifest.stamp_updated_by(caller);
            })
            .await;
        let manifest = match written {
            Ok(manifest) => manifest,
            Err(err) => {
                self.membership.release_all(Slot::Manifest, *id, &added).await;
                return Err(err);
            }
        };
        self.membership
            .release_all(Slot::Manifest, *id, &dropped)
            .await;

        tracing::info!(
            manifest_id = %id,
            added = added.len(),
            dropped = dropped.len(),
            "manifest orders replaced"
        );

        self.propagate(manifest, OrderStatus::Manifested).await
    }

    /// Take one order out of the manifest and move it to the manifest
    /// recovery status
    pub async fn remove_order(
        &self,
        caller: &Caller,
        id: &Uuid,
        order_id: &Uuid,
    ) -> DocketResult<Manifest> {
        caller.require(&AuthPolicy::Authenticated)?;
        let manifest = self.load(id).await?;
        let Some(snapshot) = manifest
            .orders
            .iter()
            .find(|entry| entry.order_id == *order_id)
            .cloned()
        else {
            return Err(EntityError::not_found("manifest order", order_id).into());
        };

        let manifest = self
            .write(id, |manifest| {
                manifest.remove_order(order_id);
                manifest.stamp_updated_by(caller);
            })
            .await?;

        if let Err(err) = self
            .projector
            .detach(*id, &[*order_id], DetachReason::FromManifest)
            .await
        {
            // Put the order back so the manifest and the order agree again
            let restored = self
                .store
                .manifests
                .modify(id, &|manifest: &mut Manifest| {
                    if manifest.contains(order_id) {
                        return false;
                    }
                    manifest.orders.push(snapshot.clone());
                    manifest.recompute_totals();
                    true
                })
                .await;
            if let Err(restore_err) = restored {
                tracing::error!(
                    manifest_id = %id,
                    %order_id,
                    error = %restore_err,
                    "failed to restore order after failed detach"
                );
            }
            return Err(err);
        }

        tracing::info!(manifest_id = %id, %order_id, "order removed from manifest");
        Ok(manifest)
    }

    /// Set the manifest status and apply its effect to the orders
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: &Uuid,
        status: &str,
    ) -> DocketResult<Manifest> {
        caller.require(&AuthPolicy::Authenticated)?;
        let status = checked_status(ManifestStatus::from(status.trim().to_string()))?;
        let current = self.load(id).await?;

        // Reopening a delivered manifest takes its orders back
        if reopens(&current.status, &status) {
            self.membership
                .claim_all(Slot::Manifest, *id, &current.order_ids())
                .await?;
        }

        self.settle_status(caller, current, status).await
    }

    /// Write `status`, project its order effect, and give the orders up
    /// once the manifest is delivered
    async fn settle_status(
        &self,
        caller: &Caller,
        current: Manifest,
        status: ManifestStatus,
    ) -> DocketResult<Manifest> {
        let id = current.id;
        let manifest = self
            .write(&id, |manifest| {
                manifest.status = status.clone();
                manifest.stamp_updated_by(caller);
            })
            .await?;

        tracing::info!(
            manifest_id = %id,
            code = %manifest.code,
            status = %manifest.status,
            "manifest status changed"
        );

        let manifest = match status.order_effect() {
            Some(effect) => self.propagate(manifest, effect).await?,
            None => manifest,
        };

        if status.is_terminal() {
            self.membership
                .release_all(Slot::Manifest, id, &manifest.order_ids())
                .await;
        }
        Ok(manifest)
    }

    /// Delete the manifest and release its orders; order statuses are kept
    pub async fn delete(&self, caller: &Caller, id: &Uuid) -> DocketResult<()> {
        caller.require(&AuthPolicy::Authenticated)?;
        let manifest = self.load(id).await?;
        if !self.store.manifests.delete(id).await? {
            return Err(EntityError::not_found("manifest", id).into());
        }
        self.membership
            .release_all(Slot::Manifest, *id, &manifest.order_ids())
            .await;

        tracing::info!(manifest_id = %id, code = %manifest.code, "manifest deleted");
        Ok(())
    }

    async fn load(&self, id: &Uuid) -> DocketResult<Manifest> {
        self.store
            .manifests
            .get(id)
            .await?
            .ok_or_else(|| EntityError::not_found("manifest", id).into())
    }

    /// Apply `change` atomically to the stored manifest
    async fn write(
        &self,
        id: &Uuid,
        change: impl Fn(&mut Manifest) + Send + Sync,
    ) -> DocketResult<Manifest> {
        let outcome = self
            .store
            .manifests
            .modify(id, &|manifest: &mut Manifest| {
                change(manifest);
                true
            })
            .await?;
        outcome
            .into_inner()
            .ok_or_else(|| EntityError::not_found("manifest", id).into())
    }

    /// Advance the manifest's orders and rebuild its snapshots from them
    async fn propagate(&self, manifest: Manifest, status: OrderStatus) -> DocketResult<Manifest> {
        let report = self.projector.advance(&manifest.order_ids(), status).await?;
        if report.modified > 0 {
            tracing::info!(
                manifest_id = %manifest.id,
                %status,
                modified = report.modified,
                "manifest orders advanced"
            );
        }
        self.refresh_snapshots(manifest, &report.orders).await
    }

    async fn refresh_snapshots(&self, manifest: Manifest, orders: &[Order]) -> DocketResult<Manifest> {
        let outcome = self
            .store
            .manifests
            .modify(&manifest.id, &|stored: &mut Manifest| stored.refresh_snapshots(orders))
            .await?;
        Ok(match outcome {
            Modified::Missing => manifest,
            Modified::Unchanged(stored) | Modified::Changed(stored) => stored,
        })
    }

    async fn populate(&self, manifests: Vec<Manifest>) -> DocketResult<Vec<ManifestView>> {
        let hub_ids: Vec<Uuid> = manifests
            .iter()
            .flat_map(|m| [m.source_hub_id, m.destination_hub_id])
            .collect();
        let hubs = hub_summaries(&self.store, &hub_ids).await?;
        let summary = |id: &Uuid| -> Option<HubSummary> { hubs.get(id).cloned() };

        Ok(manifests
            .into_iter()
            .map(|manifest| ManifestView {
                source_hub: summary(&manifest.source_hub_id),
                destination_hub: summary(&manifest.destination_hub_id),
                manifest,
            })
            .collect())
    }
}

fn checked_status(status: ManifestStatus) -> DocketResult<ManifestStatus> {
    if status.as_str().trim().is_empty() {
        return Err(ValidationError::field("status", "status must not be empty").into());
    }
    Ok(status)
}

/// Whether moving from `from` to `to` reopens a delivered manifest
fn reopens(from: &ManifestStatus, to: &ManifestStatus) -> bool {
    from.is_terminal() && !to.is_terminal()
}
