//! API exposure
//!
//! Only REST is exposed. Each exposure consumes the shared [`AppState`]
//! and produces a router.
//!
//! [`AppState`]: crate::server::AppState

pub mod rest;

pub use rest::RestExposure;
