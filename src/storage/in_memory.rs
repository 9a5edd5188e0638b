//! In-memory storage backend for tests and development

use crate::core::entity::Entity;
use crate::core::error::{DocketError, EntityError};
use crate::core::query::{Condition, DocumentQuery, Sort, SortOrder};
use crate::core::service::{DocumentStore, Modified, Mutation, SequenceStore};
use crate::core::store::{matches_all, sort_documents};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// In-memory document store for one entity type
///
/// Uses RwLock for thread-safe access. `modify` runs the mutation under the
/// write lock, so single-document updates are atomic.
#[derive(Clone)]
pub struct InMemoryDocumentStore<T> {
    documents: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> InMemoryDocumentStore<T> {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Default for InMemoryDocumentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryDocumentStore<T> {
    /// Serialize, filter and sort every stored document
    fn select(&self, conditions: &[Condition], sort: Option<&Sort>) -> Result<Vec<Value>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut selected = documents
            .values()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|doc| matches_all(doc, conditions))
            .collect::<Vec<_>>();
        drop(documents);

        // Newest first unless asked otherwise
        let default_sort = Sort {
            field: "created_at".to_string(),
            order: SortOrder::Desc,
        };
        sort_documents(&mut selected, sort.unwrap_or(&default_sort));
        Ok(selected)
    }
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for InMemoryDocumentStore<T> {
    async fn insert(&self, doc: T) -> Result<T> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = doc.id();
        if documents.contains_key(&id) {
            return Err(DocketError::from(EntityError::AlreadyExists {
                entity_type: T::resource_name_singular().to_string(),
                id: id.to_string(),
            })
            .into());
        }
        documents.insert(id, doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(documents.get(id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>> {
        let documents = self
            .documents
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(ids.iter().filter_map(|id| documents.get(id).cloned()).collect())
    }

    async fn find(&self, query: &DocumentQuery) -> Result<Vec<T>> {
        let selected = self.select(&query.conditions, query.sort.as_ref())?;
        let window = selected
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX));

        window
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }

    async fn count(&self, conditions: &[Condition]) -> Result<usize> {
        if conditions.is_empty() {
            let documents = self
                .documents
                .read()
                .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
            return Ok(documents.len());
        }
        Ok(self.select(conditions, None)?.len())
    }

    async fn replace(&self, id: &Uuid, mut doc: T) -> Result<Option<T>> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(slot) = documents.get_mut(id) else {
            return Ok(None);
        };
        doc.touch();
        *slot = doc.clone();
        Ok(Some(doc))
    }

    async fn modify(&self, id: &Uuid, mutation: Mutation<'_, T>) -> Result<Modified<T>> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(slot) = documents.get_mut(id) else {
            return Ok(Modified::Missing);
        };

        let mut candidate = slot.clone();
        if !mutation(&mut candidate) {
            return Ok(Modified::Unchanged(candidate));
        }
        candidate.touch();
        *slot = candidate.clone();
        Ok(Modified::Changed(candidate))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(documents.remove(id).is_some())
    }
}

/// In-memory code counters
#[derive(Clone, Default)]
pub struct InMemorySequenceStore {
    counters: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn current(&self, key: &str) -> Result<Option<String>> {
        let counters = self
            .counters
            .lock()
            .map_err(|e| anyhow!("Failed to acquire counter lock: {}", e))?;

        Ok(counters.get(key).cloned())
    }

    async fn compare_and_set(&self, key: &str, expected: Option<&str>, next: &str) -> Result<bool> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| anyhow!("Failed to acquire counter lock: {}", e))?;

        if counters.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        counters.insert(key.to_string(), next.to_string());
        Ok(true)
    }
}
