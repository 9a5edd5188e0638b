use crate::core::auth::Caller;
use crate::core::error::DocketResult;
use crate::core::query::{ListParams, PaginatedResponse};
use crate::entities::{NewOrder, Order};
use crate::lifecycle::OrderFilter;
use crate::server::extract::Payload;
use crate::server::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().nest("/orders", routes())
}

// Orders are archived, never deleted
fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id))
        .route("/{id}/archive", put(archive))
        .route("/{id}/unarchive", put(unarchive))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Payload(input): Payload<NewOrder>,
) -> DocketResult<(StatusCode, Json<Order>)> {
    let order = state.services.orders.create(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(params): Query<ListParams>,
    Query(filter): Query<OrderFilter>,
) -> DocketResult<Json<PaginatedResponse<Order>>> {
    Ok(Json(state.services.orders.list(&params, &filter).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Order>> {
    Ok(Json(state.services.orders.get(&id).await?))
}

async fn archive(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Order>> {
    Ok(Json(state.services.orders.archive(&caller, &id).await?))
}

async fn unarchive(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> DocketResult<Json<Order>> {
    Ok(Json(state.services.orders.unarchive(&caller, &id).await?))
}
