//! # Docket
//!
//! Logistics back-office service: shipment orders grouped into manifests
//! (inter-hub transport legs), delivery run sheets (last-mile rounds) and
//! batches (item-level picking groups).
//!
//! ## Features
//!
//! - **Status projection**: aggregate status changes are projected onto the
//!   contained orders and their items, writing only what differs
//! - **Sequential codes**: per-hub `<PREFIX><LETTER><NNNNNN>` codes issued
//!   from compare-and-set counters
//! - **Membership claims**: an order is open in at most one manifest and
//!   one DRS at a time
//! - **Batch dedup**: an item id is batched once
//! - **Storage backends**: in-memory (default) and MongoDB (`mongodb_backend`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docket::prelude::*;
//!
//! let config = AppConfig::load()?;
//! let store = Store::connect(&config.storage).await?;
//! let services = Services::new(store, &config);
//!
//! ServerBuilder::new()
//!     .with_services(services)
//!     .serve(&config.server.address())
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod lifecycle;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthPolicy, Caller, Role},
        entity::Entity,
        error::{DocketError, DocketResult},
        query::{Condition, DocumentQuery, ListParams, PaginatedResponse},
        sequence::{CodeGenerator, CodeSeries},
        service::{DocumentStore, Modified, SequenceStore},
        status::{DrsStatus, HubStatus, ManifestStatus, OrderStatus, TransportType},
    };

    // === Macros ===
    pub use crate::{impl_audited, impl_entity};

    // === Documents ===
    pub use crate::entities::{
        Batch, BatchGroup, BatchItem, Drs, DrsUpdate, DrsView, Hub, HubUpdate, Manifest,
        ManifestUpdate, ManifestView, NewDrs, NewHub, NewManifest, NewOrder, Order,
    };

    // === Lifecycle ===
    pub use crate::lifecycle::{
        BatchFilter, BatchRemoval, DetachReason, DrsFilter, HubFilter, ManifestFilter,
        OrderFilter, ProjectionReport, Projector, Services,
    };

    // === Storage ===
    pub use crate::storage::{InMemoryDocumentStore, InMemorySequenceStore, Store};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
