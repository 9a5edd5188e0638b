use super::deleted;
use crate::core::auth::Caller;
use crate::core::error::DocketResult;
use crate::core::query::{ListParams, PaginatedResponse};
use crate::entities::{Hub, HubUpdate, NewHub};
use crate::lifecycle::HubFilter;
use crate::server::extract::Payload;
use crate::server::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().nest("/hubs", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/archive", put(archive))
        .route("/{id}/unarchive", put(unarchive))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(input): Payload<NewHub>,
) -> DocketResult<(StatusCode, Json<Hub>)> {
    let hub = state.services.hubs.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(hub)))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ListParams>,
    Query(filter): Query<HubFilter>,
) -> DocketResult<Json<PaginatedResponse<Hub>>> {
    Ok(Json(state.services.hubs.list(&params, &filter).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Hub>> {
    Ok(Json(state.services.hubs.get(&id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Payload(update): Payload<HubUpdate>,
) -> DocketResult<Json<Hub>> {
    Ok(Json(state.services.hubs.update(&caller, &id, update).await?))
}

async fn archive(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Hub>> {
    Ok(Json(state.services.hubs.archive(&caller, &id).await?))
}

async fn unarchive(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Hub>> {
    Ok(Json(state.services.hubs.unarchive(&caller, &id).await?))
}

async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Value>> {
    state.services.hubs.delete(&caller, &id).await?;
    Ok(deleted(id))
}
