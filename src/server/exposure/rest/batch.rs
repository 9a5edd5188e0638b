use super::deleted;
use crate::core::auth::Caller;
use crate::core::error::DocketResult;
use crate::core::query::{ListParams, PaginatedResponse};
use crate::entities::Batch;
use crate::lifecycle::{BatchFilter, BatchRemoval};
use crate::server::extract::Payload;
use crate::server::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().nest("/batch", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete_batch))
        .route("/{id}/items/{item_id}", delete(remove_item))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(payload): Payload<Value>,
) -> DocketResult<(StatusCode, Json<Batch>)> {
    let batch = state.services.batches.create(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ListParams>,
    Query(filter): Query<BatchFilter>,
) -> DocketResult<Json<PaginatedResponse<Batch>>> {
    Ok(Json(state.services.batches.list(&params, &filter).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Batch>> {
    Ok(Json(state.services.batches.get(&id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Payload(payload): Payload<Value>,
) -> DocketResult<Json<Batch>> {
    Ok(Json(
        state.services.batches.update(&caller, &id, payload).await?,
    ))
}

/// `item_id` arrives percent-decoded
async fn remove_item(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, String)>,
) -> DocketResult<Json<BatchRemoval>> {
    Ok(Json(
        state
            .services
            .batches
            .remove_item(&caller, &id, &item_id)
            .await?,
    ))
}

async fn delete_batch(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Value>> {
    state.services.batches.delete(&caller, &id).await?;
    Ok(deleted(id))
}
