//! Evaluation of [`Condition`]s and [`Sort`]s against JSON documents
//!
//! Backends without a native query engine serialize documents to
//! `serde_json::Value` and filter them here. Semantics follow document
//! databases: a dotted path fans out over arrays, and a condition holds
//! when any value reached by the path satisfies it.

use crate::core::query::{Condition, Sort, SortOrder};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Collect every value reachable through a dotted `path`
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        next.push(child);
                    }
                }
                Value::Array(elements) => {
                    for element in elements {
                        if let Some(child) = element.get(segment) {
                            next.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    // A leaf array matches through its elements as well as by itself
    let mut leaves = Vec::with_capacity(current.len());
    for value in current {
        leaves.push(value);
        if let Value::Array(elements) = value {
            leaves.extend(elements.iter());
        }
    }
    leaves
}

/// Order two JSON scalars: timestamps chronologically, numbers
/// numerically, strings lexicographically
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                x.parse::<DateTime<Utc>>().ok(),
                y.parse::<DateTime<Utc>>().ok(),
            ) {
                (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Whether `doc` satisfies `condition`
pub fn matches(doc: &Value, condition: &Condition) -> bool {
    let values = resolve_path(doc, condition.field());
    match condition {
        Condition::Eq { value, .. } => values.iter().any(|v| *v == value),
        Condition::In { values: wanted, .. } => {
            values.iter().any(|v| wanted.iter().any(|w| *v == w))
        }
        Condition::Contains { needle, .. } => {
            let needle = needle.to_lowercase();
            values
                .iter()
                .filter_map(|v| v.as_str())
                .any(|s| s.to_lowercase().contains(&needle))
        }
        Condition::Gte { value, .. } => values
            .iter()
            .any(|v| matches!(compare_values(v, value), Some(Ordering::Greater | Ordering::Equal))),
        Condition::Lte { value, .. } => values
            .iter()
            .any(|v| matches!(compare_values(v, value), Some(Ordering::Less | Ordering::Equal))),
    }
}

/// Whether `doc` satisfies every condition
pub fn matches_all(doc: &Value, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| matches(doc, c))
}

/// Sort documents in place by the first value at the sort path
pub fn sort_documents(docs: &mut [Value], sort: &Sort) {
    docs.sort_by(|a, b| {
        let left = resolve_path(a, &sort.field).into_iter().next().unwrap_or(&Value::Null);
        let right = resolve_path(b, &sort.field).into_iter().next().unwrap_or(&Value::Null);
        let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
        match sort.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}
