//! Order-aggregation lifecycle
//!
//! Services for orders, hubs and the three aggregates that group orders:
//! manifests (inter-hub legs), delivery run sheets (last-mile rounds) and
//! batches (item-level picking groups).
//!
//! Every aggregate operation follows the same shape: check the caller,
//! validate input and referenced documents, write the aggregate, then
//! project the new status onto the contained orders.

pub mod batch;
pub mod drs;
pub mod hub;
pub mod manifest;
pub mod membership;
pub mod order;
pub mod projector;

pub use batch::{BatchFilter, BatchRemoval, BatchService};
pub use drs::{DrsFilter, DrsService, RemoveOrderRequest};
pub use hub::{HubFilter, HubService};
pub use manifest::{ManifestFilter, ManifestService};
pub use membership::{Membership, Slot};
pub use order::{OrderFilter, OrderService};
pub use projector::{DetachReason, ProjectionReport, Projector};

use crate::config::AppConfig;
use crate::core::error::{DocketResult, EntityError};
use crate::core::sequence::CodeGenerator;
use crate::entities::{Hub, HubSummary, Order};
use crate::storage::Store;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// All lifecycle services over one store
#[derive(Clone)]
pub struct Services {
    pub orders: OrderService,
    pub hubs: HubService,
    pub manifests: ManifestService,
    pub drs: DrsService,
    pub batches: BatchService,
}

impl Services {
    pub fn new(store: Store, config: &AppConfig) -> Self {
        let codes = CodeGenerator::new(store.sequences.clone(), config.sequences.max_attempts);
        let pagination = config.pagination.clone();

        Self {
            orders: OrderService::new(store.clone(), pagination.clone()),
            hubs: HubService::new(store.clone(), pagination.clone()),
            manifests: ManifestService::new(store.clone(), codes.clone(), pagination.clone()),
            drs: DrsService::new(store.clone(), codes, pagination.clone()),
            batches: BatchService::new(store, pagination),
        }
    }
}

/// Load every order in `ids`, in order and without repeats
///
/// Fails with `MissingReferences` naming every unknown id when any is
/// missing, before anything is written.
pub(crate) async fn resolve_orders(store: &Store, ids: &[Uuid]) -> DocketResult<Vec<Order>> {
    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    let found = store.orders.get_many(&ids).await?;
    let known: HashSet<Uuid> = found.iter().map(|order| order.id).collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !known.contains(id))
        .map(Uuid::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(EntityError::MissingReferences {
            entity_type: "order".to_string(),
            ids: missing,
        }
        .into());
    }
    Ok(found)
}

pub(crate) async fn require_hub(store: &Store, id: &Uuid) -> DocketResult<Hub> {
    store
        .hubs
        .get(id)
        .await?
        .ok_or_else(|| EntityError::not_found("hub", id).into())
}

/// Summaries of the hubs among `ids` that exist
pub(crate) async fn hub_summaries(
    store: &Store,
    ids: &[Uuid],
) -> DocketResult<HashMap<Uuid, HubSummary>> {
    let unique: Vec<Uuid> = ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    Ok(store
        .hubs
        .get_many(&unique)
        .await?
        .iter()
        .map(|hub| (hub.id, HubSummary::from(hub)))
        .collect())
}
