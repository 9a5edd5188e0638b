//! REST exposure
//!
//! One router per resource root, merged with the health routes. Every
//! resource route requires a [`Caller`](crate::core::auth::Caller).

mod batch;
mod drs;
mod hub;
mod manifest;
mod order;

use crate::server::state::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub struct RestExposure;

impl RestExposure {
    /// Build the REST router over `state`, merging `custom_routes` in
    pub fn build_router(state: AppState, custom_routes: Vec<Router<AppState>>) -> Router {
        let mut app = Router::new()
            .merge(Self::health_routes())
            .merge(order::router())
            .merge(hub::router())
            .merge(manifest::router())
            .merge(drs::router())
            .merge(batch::router());

        for custom in custom_routes {
            app = app.merge(custom);
        }

        app.with_state(state)
    }

    fn health_routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "docket"
        }))
    }
}

/// Body of a successful delete
fn deleted(id: impl ToString) -> Json<Value> {
    Json(json!({ "id": id.to_string(), "deleted": true }))
}
