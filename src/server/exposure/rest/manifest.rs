use super::deleted;
use crate::core::auth::Caller;
use crate::core::error::DocketResult;
use crate::core::query::{ListParams, PaginatedResponse};
use crate::entities::{Manifest, ManifestUpdate, ManifestView, NewManifest};
use crate::lifecycle::ManifestFilter;
use crate::server::extract::Payload;
use crate::server::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().nest("/manifest", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route(
            "/{id}/order/{order_id}",
            put(remove_order).delete(remove_order),
        )
        .route("/{id}/status/{status}", put(update_status))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(input): Payload<NewManifest>,
) -> DocketResult<(StatusCode, Json<Manifest>)> {
    let manifest = state.services.manifests.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(manifest)))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ListParams>,
    Query(filter): Query<ManifestFilter>,
) -> DocketResult<Json<PaginatedResponse<ManifestView>>> {
    Ok(Json(state.services.manifests.list(&params, &filter).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<ManifestView>> {
    Ok(Json(state.services.manifests.get(&id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Payload(update): Payload<ManifestUpdate>,
) -> DocketResult<Json<Manifest>> {
    Ok(Json(
        state.services.manifests.update(&caller, &id, update).await?,
    ))
}

async fn remove_order(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
) -> DocketResult<Json<Manifest>> {
    Ok(Json(
        state
            .services
            .manifests
            .remove_order(&caller, &id, &order_id)
            .await?,
    ))
}

async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, status)): Path<(Uuid, String)>,
) -> DocketResult<Json<Manifest>> {
    Ok(Json(
        state
            .services
            .manifests
            .update_status(&caller, &id, &status)
            .await?,
    ))
}

async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Value>> {
    state.services.manifests.delete(&caller, &id).await?;
    Ok(deleted(id))
}
