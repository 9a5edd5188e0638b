//! HTTP server
//!
//! [`ServerBuilder`] assembles the REST routes over a set of lifecycle
//! services, adds tracing and CORS layers and serves with graceful
//! shutdown.

pub mod builder;
pub mod exposure;
pub mod extract;
pub mod state;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use extract::Payload;
pub use state::AppState;
