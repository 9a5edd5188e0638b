//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;

pub use in_memory::{InMemoryDocumentStore, InMemorySequenceStore};
#[cfg(feature = "mongodb_backend")]
pub use mongodb::{MongoDocumentStore, MongoSequenceStore, ensure_indexes};

use crate::config::{StorageBackend, StorageConfig};
use crate::core::error::DocketResult;
use crate::core::service::{DocumentStore, SequenceStore};
use crate::entities::{Batch, Drs, Hub, Manifest, Order};
use std::sync::Arc;

/// Every collection the lifecycle services work on
#[derive(Clone)]
pub struct Store {
    pub orders: Arc<dyn DocumentStore<Order>>,
    pub hubs: Arc<dyn DocumentStore<Hub>>,
    pub manifests: Arc<dyn DocumentStore<Manifest>>,
    pub drs: Arc<dyn DocumentStore<Drs>>,
    pub batches: Arc<dyn DocumentStore<Batch>>,
    pub sequences: Arc<dyn SequenceStore>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryDocumentStore::new()),
            hubs: Arc::new(InMemoryDocumentStore::new()),
            manifests: Arc::new(InMemoryDocumentStore::new()),
            drs: Arc::new(InMemoryDocumentStore::new()),
            batches: Arc::new(InMemoryDocumentStore::new()),
            sequences: Arc::new(InMemorySequenceStore::new()),
        }
    }

    #[cfg(feature = "mongodb_backend")]
    pub fn mongodb(database: ::mongodb::Database) -> Self {
        Self {
            orders: Arc::new(MongoDocumentStore::new(database.clone())),
            hubs: Arc::new(MongoDocumentStore::new(database.clone())),
            manifests: Arc::new(MongoDocumentStore::new(database.clone())),
            drs: Arc::new(MongoDocumentStore::new(database.clone())),
            batches: Arc::new(MongoDocumentStore::new(database.clone())),
            sequences: Arc::new(MongoSequenceStore::new(database)),
        }
    }

    /// Open the configured backend
    pub async fn connect(config: &StorageConfig) -> DocketResult<Self> {
        match config.backend {
            StorageBackend::InMemory => Ok(Self::in_memory()),
            #[cfg(feature = "mongodb_backend")]
            StorageBackend::Mongodb => {
                let client = ::mongodb::Client::with_uri_str(&config.uri)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to MongoDB: {}", e))?;
                let database = client.database(&config.database);
                ensure_indexes(&database).await?;
                tracing::info!(database = %config.database, "connected to MongoDB");
                Ok(Self::mongodb(database))
            }
            #[cfg(not(feature = "mongodb_backend"))]
            StorageBackend::Mongodb => Err(crate::core::error::ConfigError::InvalidValue {
                field: "storage.backend".to_string(),
                value: "mongodb".to_string(),
                message: "built without the mongodb_backend feature".to_string(),
            }
            .into()),
        }
    }
}
