//! Core module containing the fundamental traits and types of the service

pub mod auth;
pub mod entity;
pub mod error;
pub mod query;
pub mod sequence;
pub mod service;
pub mod status;
pub mod store;

pub use auth::{AuthPolicy, Caller, Role};
pub use entity::Entity;
pub use error::{
    ConfigError, ConflictError, DocketError, DocketResult, EntityError, RequestError,
    StorageError, ValidationError,
};
pub use query::{
    Condition, DocumentQuery, ListParams, PaginatedResponse, PaginationMeta, Sort, SortOrder,
};
pub use sequence::{CodeGenerator, CodeSeries, next_code};
pub use service::{DocumentStore, Modified, Mutation, SequenceStore};
pub use status::{DrsStatus, HubStatus, ManifestStatus, OrderStatus, TransportType};
