//! Storage traits consumed by the lifecycle services
//!
//! The services are agnostic to the storage mechanism. Backends live in
//! [`crate::storage`].

use crate::core::entity::Entity;
use crate::core::query::{Condition, DocumentQuery};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Outcome of an atomic single-document update
#[derive(Debug, Clone)]
pub enum Modified<T> {
    /// No document with that id
    Missing,
    /// The mutation left the document as it was; nothing was written
    Unchanged(T),
    /// The mutation changed the document and it was written
    Changed(T),
}

impl<T> Modified<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Modified::Changed(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Modified::Missing)
    }

    /// The document after the update, if it exists
    pub fn into_inner(self) -> Option<T> {
        match self {
            Modified::Missing => None,
            Modified::Unchanged(doc) | Modified::Changed(doc) => Some(doc),
        }
    }
}

/// A mutation applied to one document; returns whether it changed anything.
///
/// Backends may call it more than once when an optimistic write loses a
/// race, so it must only depend on the document it is given.
pub type Mutation<'a, T> = &'a (dyn Fn(&mut T) -> bool + Send + Sync);

/// Document persistence for one entity type
///
/// Implementations provide CRUD, filtered queries and an atomic
/// read-modify-write on a single document.
#[async_trait]
pub trait DocumentStore<T: Entity>: Send + Sync {
    /// Insert a new document; fails if the id is already taken
    async fn insert(&self, doc: T) -> Result<T>;

    /// Get a document by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// Get every existing document among `ids`; unknown ids are skipped
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<T>>;

    /// Filter, sort and page documents
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<T>>;

    /// Count documents matching every condition
    async fn count(&self, conditions: &[Condition]) -> Result<usize>;

    /// Replace a whole document; `None` if it does not exist
    async fn replace(&self, id: &Uuid, doc: T) -> Result<Option<T>>;

    /// Apply `mutation` to one document atomically
    ///
    /// When the mutation reports a change the backend refreshes
    /// `updated_at` and writes the document; otherwise nothing is written.
    async fn modify(&self, id: &Uuid, mutation: Mutation<'_, T>) -> Result<Modified<T>>;

    /// Delete a document; returns whether it existed
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

/// Named counters used to issue sequential codes
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Last value issued under `key`
    async fn current(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `next` only if it still holds `expected`
    ///
    /// `expected == None` means the counter must not exist yet.
    async fn compare_and_set(&self, key: &str, expected: Option<&str>, next: &str)
    -> Result<bool>;
}
