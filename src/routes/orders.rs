//! # Order Routes
//!
//! Checkout, the active order list, status transitions and the archive of
//! completed and cancelled orders.

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::models::{ArchivedOrder, Order, OrderDetail};
use crate::error::ApiResult;
use crate::routes::extractors::{Json, Path, Query};
use crate::server::AppState;
use crate::services::checkout::merge_lines;
use crate::services::reports::ReportRange;
use crate::services::stock::optional_text;
use crate::state_structs::{
    CheckoutRequest, DateRangeQuery, OrderQuery, StatusChangeResponse, UpdateStatusRequest,
    page_size,
};

/// Places an order. Stock is checked and decremented atomically.
pub async fn checkout(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let lines = merge_lines(&payload.items)?;
    let customer = payload.customer()?;
    let shipping_address = optional_text(payload.shipping_address);
    let notes = optional_text(payload.notes);

    let order = app_state
        .db
        .checkout(
            &user,
            customer,
            &lines,
            shipping_address.as_deref(),
            notes.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(app_state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let status = query.status_filter()?;
    let orders = app_state
        .db
        .list_orders(status, query.customer_id, page_size(query.limit), query.offset())
        .await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderDetail>> {
    Ok(Json(app_state.db.get_order(id).await?))
}

/// Terminal statuses answer with the archived record instead of the order
pub async fn update_status(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<StatusChangeResponse>> {
    let response = app_state
        .db
        .update_order_status(id, &payload.status, &user)
        .await?;
    Ok(Json(response))
}

pub async fn list_archived(
    State(app_state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<ArchivedOrder>>> {
    let range = ReportRange::resolve(query.from, query.to, Utc::now())?;
    Ok(Json(app_state.db.list_archived_orders(&range).await?))
}

pub async fn get_archived(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ArchivedOrder>> {
    Ok(Json(app_state.db.get_archived_order(id).await?))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(checkout))
        .route("/api/orders/archived", get(list_archived))
        .route("/api/orders/archived/{id}", get(get_archived))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", put(update_status))
}
