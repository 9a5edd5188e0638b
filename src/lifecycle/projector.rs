//! Order status projection
//!
//! Aggregates never write order statuses themselves. They ask the
//! projector to either *advance* a set of orders to a status, or to
//! *detach* orders from an aggregate, which moves them to a fixed
//! recovery status per aggregate type and releases the membership slot.
//!
//! Every order is updated with one atomic document update, and only when
//! its status (or the status of one of its items) actually differs. A
//! repeated projection therefore writes nothing.
//!
//! Manifests embed item snapshots of their orders. Whenever a projection
//! rewrites orders, every manifest embedding one of them is rebuilt from
//! the new canonical state, whichever aggregate drove the change.

use crate::core::error::DocketResult;
use crate::core::query::{Condition, DocumentQuery};
use crate::core::service::{DocumentStore, Modified, Mutation};
use crate::core::status::OrderStatus;
use crate::entities::{Manifest, Order};
use crate::storage::Store;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Why orders leave an aggregate outside of a normal status advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    FromManifest,
    FromDrs,
}

impl DetachReason {
    /// Status an order falls back to once detached
    pub fn recovery_status(&self) -> OrderStatus {
        match self {
            DetachReason::FromManifest => OrderStatus::ReachedDestinationHub,
            DetachReason::FromDrs => OrderStatus::Pending,
        }
    }

    fn details(&self) -> &'static str {
        match self {
            DetachReason::FromManifest => "Removed from manifest",
            DetachReason::FromDrs => "Removed from delivery run sheet",
        }
    }

    fn slot<'a>(&self, order: &'a mut Order) -> &'a mut Option<Uuid> {
        match self {
            DetachReason::FromManifest => &mut order.manifest_id,
            DetachReason::FromDrs => &mut order.drs_id,
        }
    }
}

/// Outcome of one projection
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectionReport {
    /// Distinct order ids asked for
    pub requested: usize,
    /// Orders found
    pub matched: usize,
    /// Orders actually written
    pub modified: usize,
    /// Ids with no order
    pub missing: Vec<Uuid>,
    /// Current state of every matched order
    #[serde(skip)]
    pub orders: Vec<Order>,
}

impl ProjectionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Clone)]
pub struct Projector {
    orders: Arc<dyn DocumentStore<Order>>,
    manifests: Arc<dyn DocumentStore<Manifest>>,
}

impl Projector {
    pub fn new(store: &Store) -> Self {
        Self {
            orders: store.orders.clone(),
            manifests: store.manifests.clone(),
        }
    }

    /// Move every order in `ids`, and its items, to `status`
    pub async fn advance(&self, ids: &[Uuid], status: OrderStatus) -> DocketResult<ProjectionReport> {
        let details = format!("Status changed to {status}");
        let details = details.as_str();
        let mutation = move |order: &mut Order| order.apply_status(status, None, details);
        self.project(ids, status, &mutation).await
    }

    /// Move the orders `holder` still claims to the reason's recovery
    /// status and release the claim
    ///
    /// An order claimed by another aggregate, or by none, has moved on
    /// and is left exactly as it is.
    pub async fn detach(
        &self,
        holder: Uuid,
        ids: &[Uuid],
        reason: DetachReason,
    ) -> DocketResult<ProjectionReport> {
        let status = reason.recovery_status();
        let mutation = move |order: &mut Order| {
            let slot = reason.slot(order);
            if *slot != Some(holder) {
                return false;
            }
            *slot = None;
            order.apply_status(status, None, reason.details());
            true
        };
        self.project(ids, status, &mutation).await
    }

    /// Rebuild the snapshots of every manifest embedding one of `orders`
    ///
    /// Returns how many manifests were rewritten.
    pub async fn sync_snapshots(&self, orders: &[Order]) -> DocketResult<usize> {
        if orders.is_empty() {
            return Ok(0);
        }
        let embedding = Condition::In {
            field: "orders.order_id".to_string(),
            values: orders.iter().map(|order| order.id.to_string().into()).collect(),
        };
        let manifests = self
            .manifests
            .find(&DocumentQuery::new().filter(embedding))
            .await?;

        let refresh = |stored: &mut Manifest| stored.refresh_snapshots(orders);
        let outcomes = try_join_all(
            manifests
                .iter()
                .map(|manifest| self.manifests.modify(&manifest.id, &refresh)),
        )
        .await?;

        let rewritten = outcomes.iter().filter(|outcome| outcome.is_changed()).count();
        if rewritten > 0 {
            tracing::debug!(
                orders = orders.len(),
                manifests = rewritten,
                "manifest snapshots refreshed"
            );
        }
        Ok(rewritten)
    }

    async fn project(
        &self,
        ids: &[Uuid],
        status: OrderStatus,
        mutation: Mutation<'_, Order>,
    ) -> DocketResult<ProjectionReport> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let outcomes = try_join_all(ids.iter().map(|id| self.orders.modify(id, mutation))).await?;

        let mut report = ProjectionReport {
            requested: ids.len(),
            ..Default::default()
        };
        let mut rewritten = Vec::new();
        for (id, outcome) in ids.iter().zip(outcomes) {
            match outcome {
                Modified::Missing => report.missing.push(*id),
                Modified::Unchanged(order) => {
                    report.matched += 1;
                    report.orders.push(order);
                }
                Modified::Changed(order) => {
                    report.matched += 1;
                    report.modified += 1;
                    rewritten.push(order.clone());
                    report.orders.push(order);
                }
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                %status,
                requested = report.requested,
                matched = report.matched,
                missing = ?report.missing,
                "projection skipped orders that do not exist"
            );
        }
        tracing::debug!(
            %status,
            requested = report.requested,
            modified = report.modified,
            "projected order status"
        );

        self.sync_snapshots(&rewritten).await?;
        Ok(report)
    }
}
