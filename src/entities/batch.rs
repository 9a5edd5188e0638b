//! Batches: order items grouped for picking and loading

use crate::core::error::{DocketError, RequestError, ValidationError};
use crate::core::status::OrderStatus;
use crate::{impl_audited, impl_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(alias = "itemId")]
    pub item_id: String,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// Items of one order inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchGroup {
    pub parent_id: Uuid,
    #[serde(default)]
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    #[serde(default)]
    pub groups: Vec<BatchGroup>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::core::entity::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Batch, "batch", "batches");
impl_audited!(Batch);

impl Batch {
    pub fn new(groups: Vec<BatchGroup>, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            groups,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.items.iter().map(|item| item.item_id.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|group| group.items.is_empty())
    }

    /// Remove `item_id` from whichever group holds it, dropping the group
    /// once it is empty; returns whether the item was present
    pub fn remove_item(&mut self, item_id: &str) -> bool {
        let mut removed = false;
        for group in self.groups.iter_mut() {
            let before = group.items.len();
            group.items.retain(|item| item.item_id != item_id);
            removed |= group.items.len() != before;
        }
        if removed {
            self.groups.retain(|group| !group.items.is_empty());
        }
        removed
    }
}

/// Keep only the items whose id is not in `taken`
///
/// Groups left without items are dropped. Item ids repeated inside the
/// input are kept once.
pub fn dedup_groups(groups: Vec<BatchGroup>, taken: &HashSet<String>) -> Vec<BatchGroup> {
    let mut seen: HashSet<String> = HashSet::new();
    groups
        .into_iter()
        .filter_map(|mut group| {
            group.items.retain(|item| {
                !taken.contains(&item.item_id) && seen.insert(item.item_id.clone())
            });
            (!group.items.is_empty()).then_some(group)
        })
        .collect()
}

#[derive(Deserialize)]
struct Wrapper {
    #[serde(alias = "ordersIDs", alias = "orderIds")]
    orders_ids: Vec<BatchGroup>,
}

/// Parse the groups of a batch payload
///
/// Accepted shapes:
/// - `[{ "ordersIDs": [group, ...] }, ...]`
/// - `{ "ordersIDs": [group, ...] }`
/// - `[group, ...]`
pub fn parse_groups(payload: Value) -> Result<Vec<BatchGroup>, DocketError> {
    let invalid = |message: String| RequestError::InvalidBody { message };

    match payload {
        Value::Array(entries) => {
            let wrapped = entries
                .first()
                .and_then(Value::as_object)
                .is_some_and(|first| {
                    first.contains_key("ordersIDs")
                        || first.contains_key("orders_ids")
                        || first.contains_key("orderIds")
                });

            if wrapped {
                let wrappers: Vec<Wrapper> = serde_json::from_value(Value::Array(entries))
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(wrappers.into_iter().flat_map(|w| w.orders_ids).collect())
            } else {
                serde_json::from_value(Value::Array(entries))
                    .map_err(|e| invalid(e.to_string()).into())
            }
        }
        Value::Object(_) => {
            let wrapper: Wrapper =
                serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))?;
            Ok(wrapper.orders_ids)
        }
        _ => Err(ValidationError::field("body", "batch payload must be an array").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(parent: Uuid, items: &[&str]) -> BatchGroup {
        BatchGroup {
            parent_id: parent,
            items: items
                .iter()
                .map(|id| BatchItem {
                    item_id: id.to_string(),
                    status: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_wrapped_payload() {
        let parent = Uuid::new_v4();
        let groups = parse_groups(json!([
            { "ordersIDs": [ { "parent_id": parent, "items": [ { "itemId": "X1" } ] } ] }
        ]))
        .unwrap();
        assert_eq!(groups, vec![group(parent, &["X1"])]);
    }

    #[test]
    fn test_parse_flat_and_single_wrapper() {
        let parent = Uuid::new_v4();
        let flat = parse_groups(json!([{ "parent_id": parent, "items": [{ "item_id": "A" }] }])).unwrap();
        let single =
            parse_groups(json!({ "ordersIDs": [{ "parent_id": parent, "items": [{ "item_id": "A" }] }] }))
                .unwrap();
        assert_eq!(flat, single);
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert!(parse_groups(json!("X1")).is_err());
    }

    #[test]
    fn test_dedup_drops_taken_items_and_empty_groups() {
        let (o1, o2) = (Uuid::new_v4(), Uuid::new_v4());
        let taken: HashSet<String> = ["X1".to_string()].into_iter().collect();

        let kept = dedup_groups(vec![group(o1, &["X1", "X2"]), group(o2, &["X1"])], &taken);

        assert_eq!(kept, vec![group(o1, &["X2"])]);
    }

    #[test]
    fn test_remove_item_drops_empty_group() {
        let (o1, o2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut batch = Batch::new(vec![group(o1, &["X1"]), group(o2, &["Y1", "Y2"])], "emp-1");

        assert!(batch.remove_item("X1"));
        assert_eq!(batch.groups.len(), 1);
        assert!(!batch.remove_item("X1"));

        batch.remove_item("Y1");
        batch.remove_item("Y2");
        assert!(batch.is_empty());
    }
}
