//! Documents persisted by the service

pub mod macros;

pub mod batch;
pub mod drs;
pub mod hub;
pub mod manifest;
pub mod order;

pub use batch::{Batch, BatchGroup, BatchItem};
pub use drs::{Drs, DrsOrderSummary, DrsUpdate, DrsView, NewDrs};
pub use hub::{Hub, HubSummary, HubUpdate, NewHub};
pub use manifest::{Manifest, ManifestOrder, ManifestUpdate, ManifestView, NewManifest};
pub use order::{Contact, Dimension, HistoryEntry, NewOrder, NewOrderItem, Order, OrderItem, Party};
