use super::deleted;
use crate::core::auth::Caller;
use crate::core::error::DocketResult;
use crate::core::query::{ListParams, PaginatedResponse};
use crate::entities::{Drs, DrsUpdate, DrsView, NewDrs};
use crate::lifecycle::{DrsFilter, RemoveOrderRequest};
use crate::server::extract::Payload;
use crate::server::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().nest("/drs", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        // Older clients send the ids in the body
        .route("/remove-order", delete(remove_order_by_body))
        .route("/{id}", get(get_by_id).put(update).delete(delete_drs))
        .route(
            "/{id}/order/{order_id}",
            put(remove_order).delete(remove_order),
        )
        .route("/{id}/status/{status}", put(update_status))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(input): Payload<NewDrs>,
) -> DocketResult<(StatusCode, Json<Drs>)> {
    let drs = state.services.drs.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(drs)))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ListParams>,
    Query(filter): Query<DrsFilter>,
) -> DocketResult<Json<PaginatedResponse<DrsView>>> {
    Ok(Json(state.services.drs.list(&params, &filter).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<DrsView>> {
    Ok(Json(state.services.drs.get(&id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Payload(update): Payload<DrsUpdate>,
) -> DocketResult<Json<Drs>> {
    Ok(Json(state.services.drs.update(&caller, &id, update).await?))
}

async fn remove_order(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
) -> DocketResult<Json<Drs>> {
    Ok(Json(
        state
            .services
            .drs
            .remove_order(&caller, &id, &order_id)
            .await?,
    ))
}

async fn remove_order_by_body(
    State(state): State<AppState>,
    caller: Caller,
    Payload(request): Payload<RemoveOrderRequest>,
) -> DocketResult<Json<Drs>> {
    Ok(Json(
        state
            .services
            .drs
            .remove_order(&caller, &request.drs_id, &request.order_id)
            .await?,
    ))
}

async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, status)): Path<(Uuid, String)>,
) -> DocketResult<Json<Drs>> {
    Ok(Json(
        state
            .services
            .drs
            .update_status(&caller, &id, &status)
            .await?,
    ))
}

async fn delete_drs(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Value>> {
    state.services.drs.delete(&caller, &id).await?;
    Ok(deleted(id))
}
