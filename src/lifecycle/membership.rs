//! Order membership claims
//!
//! An order is open in at most one manifest and at most one DRS. The
//! holder's id is recorded on the order (`manifest_id` / `drs_id`) with a
//! conditional single-document update before the aggregate is written.

use crate::core::error::{ConflictError, DocketResult, EntityError};
use crate::core::service::{DocumentStore, Modified};
use crate::entities::Order;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Manifest,
    Drs,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Manifest => "manifest",
            Slot::Drs => "drs",
        }
    }

    fn holder(&self, order: &Order) -> Option<Uuid> {
        match self {
            Slot::Manifest => order.manifest_id,
            Slot::Drs => order.drs_id,
        }
    }

    fn field<'a>(&self, order: &'a mut Order) -> &'a mut Option<Uuid> {
        match self {
            Slot::Manifest => &mut order.manifest_id,
            Slot::Drs => &mut order.drs_id,
        }
    }
}

#[derive(Clone)]
pub struct Membership {
    orders: Arc<dyn DocumentStore<Order>>,
}

impl Membership {
    pub fn new(orders: Arc<dyn DocumentStore<Order>>) -> Self {
        Self { orders }
    }

    /// Claim every order in `ids` for `holder`
    ///
    /// Orders already held by `holder` are fine. On the first failure the
    /// claims taken by this call are released and the error returned, so
    /// nothing stays claimed.
    pub async fn claim_all(&self, slot: Slot, holder: Uuid, ids: &[Uuid]) -> DocketResult<()> {
        let mut taken = Vec::with_capacity(ids.len());
        for id in ids {
            match self.claim(slot, holder, id).await {
                Ok(true) => taken.push(*id),
                Ok(false) => {}
                Err(err) => {
                    self.release_all(slot, holder, &taken).await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Returns whether this call took the claim
    async fn claim(&self, slot: Slot, holder: Uuid, id: &Uuid) -> DocketResult<bool> {
        let outcome = self
            .orders
            .modify(id, &|order: &mut Order| {
                let field = slot.field(order);
                if field.is_none() {
                    *field = Some(holder);
                    true
                } else {
                    false
                }
            })
            .await?;

        match outcome {
            Modified::Missing => Err(EntityError::not_found("order", id).into()),
            Modified::Changed(_) => Ok(true),
            Modified::Unchanged(order) => match slot.holder(&order) {
                Some(current) if current == holder => Ok(false),
                Some(current) => Err(ConflictError::AlreadyAssigned {
                    order_id: id.to_string(),
                    aggregate: slot.as_str().to_string(),
                    holder_id: current.to_string(),
                }
                .into()),
                None => Ok(false),
            },
        }
    }

    /// Release the claims `holder` has on `ids`
    ///
    /// Claims held by someone else are left alone. Failures are logged,
    /// not returned: releasing is always a follow-up to a write that
    /// already succeeded or already failed.
    pub async fn release_all(&self, slot: Slot, holder: Uuid, ids: &[Uuid]) {
        for id in ids {
            let released = self
                .orders
                .modify(id, &|order: &mut Order| {
                    let field = slot.field(order);
                    if *field == Some(holder) {
                        *field = None;
                        true
                    } else {
                        false
                    }
                })
                .await;

            if let Err(err) = released {
                tracing::warn!(
                    slot = slot.as_str(),
                    %holder,
                    order_id = %id,
                    error = %err,
                    "failed to release order claim"
                );
            }
        }
    }
}
