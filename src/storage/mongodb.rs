//! MongoDB storage backend using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag.
//!
//! # Storage model
//!
//! One collection per document type, named by `T::resource_name()`
//! ("orders", "manifests", ...). Code counters live in a `sequences`
//! collection keyed by `<series>:<prefix>`.
//!
//! # Serialization strategy
//!
//! Documents are serialized via `serde_json::Value` as an intermediate
//! format, then converted to BSON. UUIDs and timestamps are therefore
//! stored as strings. Entity timestamps go through
//! [`timestamp`](crate::core::entity::timestamp), which always writes nine
//! fractional digits in UTC, so lexical order is time order for sorts and
//! for the bounds built by [`Condition::since`] and [`Condition::until`].
//! The `id` field is mapped to MongoDB's `_id` convention.

use crate::core::entity::Entity;
use crate::core::error::{DocketError, EntityError};
use crate::core::query::{Condition, DocumentQuery, SortOrder};
use crate::core::service::{DocumentStore, Modified, Mutation, SequenceStore};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use uuid::Uuid;

const DUPLICATE_KEY: i32 = 11000;
const MODIFY_ATTEMPTS: usize = 16;
const SEQUENCES_COLLECTION: &str = "sequences";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id`.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

fn field_name(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

fn value_bson(value: &serde_json::Value) -> Result<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| anyhow!("Failed to convert filter value: {}", e))
}

fn escape_regex(needle: &str) -> String {
    needle
        .chars()
        .flat_map(|c| {
            let escape = matches!(
                c,
                '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
            );
            escape.then_some('\\').into_iter().chain(std::iter::once(c))
        })
        .collect()
}

/// Translate conditions into a MongoDB filter
///
/// Dotted paths already traverse arrays in MongoDB, so equality on
/// `groups.items.item_id` matches any nested item.
fn conditions_to_filter(conditions: &[Condition]) -> Result<Document> {
    let mut clauses = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let field = field_name(condition.field());
        let clause = match condition {
            Condition::Eq { value, .. } => doc! { field: value_bson(value)? },
            Condition::In { values, .. } => {
                let values = values.iter().map(value_bson).collect::<Result<Vec<_>>>()?;
                doc! { field: { "$in": values } }
            }
            Condition::Contains { needle, .. } => {
                doc! { field: { "$regex": escape_regex(needle), "$options": "i" } }
            }
            Condition::Gte { value, .. } => doc! { field: { "$gte": value_bson(value)? } },
            Condition::Lte { value, .. } => doc! { field: { "$lte": value_bson(value)? } },
        };
        clauses.push(clause);
    }

    Ok(match clauses.len() {
        0 => doc! {},
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    })
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

// ---------------------------------------------------------------------------
// MongoDocumentStore<T>
// ---------------------------------------------------------------------------

/// Document store backed by one MongoDB collection
///
/// # Example
///
/// ```rust,ignore
/// let client = mongodb::Client::with_uri_str("mongodb://localhost:27017").await?;
/// let orders = MongoDocumentStore::<Order>::new(client.database("docket"));
/// ```
#[derive(Clone, Debug)]
pub struct MongoDocumentStore<T> {
    database: Database,
    _marker: std::marker::PhantomData<T>,
}

impl<T> MongoDocumentStore<T> {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Entity> MongoDocumentStore<T> {
    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(T::resource_name())
    }

    fn entity_to_document(entity: &T) -> Result<Document> {
        let json = serde_json::to_value(entity)
            .map_err(|e| anyhow!("Failed to serialize {}: {}", T::resource_name_singular(), e))?;
        json_to_document(json)
    }

    fn document_to_entity(doc: Document) -> Result<T> {
        let json = document_to_json(doc);
        serde_json::from_value(json).map_err(|e| {
            anyhow!(
                "Failed to deserialize {} from document: {}",
                T::resource_name_singular(),
                e
            )
        })
    }
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for MongoDocumentStore<T> {
    async fn insert(&self, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;

        if let Err(e) = self.collection().insert_one(doc).await {
            if is_duplicate_key(&e) {
                return Err(DocketError::from(EntityError::AlreadyExists {
                    entity_type: T::resource_name_singular().to_string(),
                    id: entity.id().to_string(),
                })
                .into());
            }
            return Err(anyhow!(
                "Failed to insert {}: {}",
                T::resource_name_singular(),
                e
            ));
        }

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to get {}: {}", T::resource_name_singular(), e))?;

        doc.map(Self::document_to_entity).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted: Vec<Bson> = ids.iter().map(uuid_bson).collect();
        let cursor = self
            .collection()
            .find(doc! { "_id": { "$in": wanted } })
            .await
            .map_err(|e| anyhow!("Failed to get {}: {}", T::resource_name(), e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect {}: {}", T::resource_name(), e))?;

        let found = docs
            .into_iter()
            .map(Self::document_to_entity)
            .collect::<Result<Vec<T>>>()?;

        // Keep the order of `ids`
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|doc| doc.id() == *id).cloned())
            .collect())
    }

    async fn find(&self, query: &DocumentQuery) -> Result<Vec<T>> {
        let filter = conditions_to_filter(&query.conditions)?;
        let sort = match &query.sort {
            Some(sort) => {
                let direction = match sort.order {
                    SortOrder::Asc => 1,
                    SortOrder::Desc => -1,
                };
                doc! { field_name(&sort.field): direction }
            }
            None => doc! { "created_at": -1 },
        };

        let collection = self.collection();
        let mut action = collection
            .find(filter)
            .sort(sort)
            .skip(query.skip as u64);
        if let Some(limit) = query.limit {
            action = action.limit(limit as i64);
        }

        let cursor = action
            .await
            .map_err(|e| anyhow!("Failed to find {}: {}", T::resource_name(), e))?;
        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect {}: {}", T::resource_name(), e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }

    async fn count(&self, conditions: &[Condition]) -> Result<usize> {
        let filter = conditions_to_filter(conditions)?;
        let count = self
            .collection()
            .count_documents(filter)
            .await
            .map_err(|e| anyhow!("Failed to count {}: {}", T::resource_name(), e))?;
        Ok(count as usize)
    }

    async fn replace(&self, id: &Uuid, mut entity: T) -> Result<Option<T>> {
        entity.touch();
        let doc = Self::entity_to_document(&entity)?;

        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, doc)
            .await
            .map_err(|e| anyhow!("Failed to replace {}: {}", T::resource_name_singular(), e))?;

        Ok((result.matched_count > 0).then_some(entity))
    }

    /// Optimistic read-modify-write guarded on the stored `updated_at`
    async fn modify(&self, id: &Uuid, mutation: Mutation<'_, T>) -> Result<Modified<T>> {
        for attempt in 1..=MODIFY_ATTEMPTS {
            let Some(stored) = self
                .collection()
                .find_one(doc! { "_id": uuid_bson(id) })
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", T::resource_name_singular(), e))?
            else {
                return Ok(Modified::Missing);
            };

            let version = stored.get("updated_at").cloned().unwrap_or(Bson::Null);
            let mut entity = Self::document_to_entity(stored)?;
            if !mutation(&mut entity) {
                return Ok(Modified::Unchanged(entity));
            }
            entity.touch();

            let result = self
                .collection()
                .replace_one(
                    doc! { "_id": uuid_bson(id), "updated_at": version },
                    Self::entity_to_document(&entity)?,
                )
                .await
                .map_err(|e| {
                    anyhow!("Failed to update {}: {}", T::resource_name_singular(), e)
                })?;

            if result.matched_count == 1 {
                return Ok(Modified::Changed(entity));
            }
            tracing::debug!(
                collection = T::resource_name(),
                %id,
                attempt,
                "concurrent update, retrying"
            );
        }

        Err(anyhow!(
            "{} {} kept changing under concurrent updates",
            T::resource_name_singular(),
            id
        ))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = self
            .collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to delete {}: {}", T::resource_name_singular(), e))?;

        Ok(result.deleted_count > 0)
    }
}

// ---------------------------------------------------------------------------
// MongoSequenceStore
// ---------------------------------------------------------------------------

/// Code counters stored as `{ _id: key, value: code }`
#[derive(Clone, Debug)]
pub struct MongoSequenceStore {
    database: Database,
}

impl MongoSequenceStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(SEQUENCES_COLLECTION)
    }
}

#[async_trait]
impl SequenceStore for MongoSequenceStore {
    async fn current(&self, key: &str) -> Result<Option<String>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": key })
            .await
            .map_err(|e| anyhow!("Failed to read counter {}: {}", key, e))?;

        Ok(doc.and_then(|d| d.get_str("value").ok().map(str::to_string)))
    }

    async fn compare_and_set(&self, key: &str, expected: Option<&str>, next: &str) -> Result<bool> {
        match expected {
            None => match self
                .collection()
                .insert_one(doc! { "_id": key, "value": next })
                .await
            {
                Ok(_) => Ok(true),
                Err(e) if is_duplicate_key(&e) => Ok(false),
                Err(e) => Err(anyhow!("Failed to create counter {}: {}", key, e)),
            },
            Some(expected) => {
                let result = self
                    .collection()
                    .update_one(
                        doc! { "_id": key, "value": expected },
                        doc! { "$set": { "value": next } },
                    )
                    .await
                    .map_err(|e| anyhow!("Failed to advance counter {}: {}", key, e))?;
                Ok(result.modified_count == 1)
            }
        }
    }
}

/// Create the indexes the service relies on
///
/// - `orders.docket_number` unique: duplicate dockets fail on insert
/// - `manifests.code`, `drs.code` unique
/// - `batches.groups.items.item_id` for the dedup scan and item filters
///
/// Idempotent; safe to call on every startup.
pub async fn ensure_indexes(database: &Database) -> Result<()> {
    let unique = || IndexOptions::builder().unique(true).build();

    let plan: [(&str, Document, bool); 5] = [
        ("orders", doc! { "docket_number": 1 }, true),
        ("orders", doc! { "status": 1 }, false),
        ("manifests", doc! { "code": 1 }, true),
        ("drs", doc! { "code": 1 }, true),
        ("batches", doc! { "groups.items.item_id": 1 }, false),
    ];

    for (collection, keys, is_unique) in plan {
        let model = if is_unique {
            IndexModel::builder().keys(keys).options(unique()).build()
        } else {
            IndexModel::builder().keys(keys).build()
        };
        database
            .collection::<Document>(collection)
            .create_index(model)
            .await
            .map_err(|e| anyhow!("Failed to create index on {}: {}", collection, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_document_renames_id_to_underscore_id() {
        let doc = json_to_document(json!({"id": "abc", "code": "BLRA000001"})).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), "abc");
        assert!(!doc.contains_key("id"));
        assert_eq!(doc.get_str("code").unwrap(), "BLRA000001");
    }

    #[test]
    fn json_to_document_non_object_returns_error() {
        let err = json_to_document(json!("string")).unwrap_err();
        assert!(err.to_string().contains("non-object"));
    }

    #[test]
    fn document_to_json_renames_underscore_id_to_id() {
        let json = document_to_json(doc! { "_id": "abc", "status": "Pending" });

        assert_eq!(json["id"], "abc");
        assert!(json.get("_id").is_none());
    }

    #[test]
    fn filter_maps_id_and_combines_conditions() {
        let filter = conditions_to_filter(&[
            Condition::eq("id", "abc"),
            Condition::eq("groups.items.item_id", "X1"),
        ])
        .unwrap();

        let clauses = filter.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].as_document().unwrap().get_str("_id").unwrap(), "abc");
    }

    #[test]
    fn filter_contains_is_escaped_case_insensitive_regex() {
        let filter = conditions_to_filter(&[Condition::contains("vehicle_number", "ka.01")]).unwrap();
        let regex = filter.get_document("vehicle_number").unwrap();

        assert_eq!(regex.get_str("$regex").unwrap(), "ka\\.01");
        assert_eq!(regex.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn empty_conditions_match_everything() {
        assert!(conditions_to_filter(&[]).unwrap().is_empty());
    }
}
