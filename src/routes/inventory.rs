//! # Inventory Routes
//!
//! Item CRUD, stock adjustments and the category list. Deleting an item is
//! reserved for admins.

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::auth::AuthUser;
use crate::database::models::InventoryItem;
use crate::error::ApiResult;
use crate::routes::extractors::{Json, Path, Query};
use crate::server::AppState;
use crate::services::stock::normalize_sku;
use crate::state_structs::{AdjustStockRequest, CreateItemRequest, InventoryQuery, UpdateItemRequest};

pub async fn list_items(
    State(app_state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let stock = query.stock_filter()?;
    let pattern = query.search_pattern();
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let items = app_state
        .db
        .list_inventory(pattern.as_deref(), category, stock)
        .await?;
    Ok(Json(items))
}

pub async fn get_item(
    State(app_state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    let sku = normalize_sku(&sku)?;
    Ok(Json(app_state.db.get_item(&sku).await?))
}

pub async fn list_categories(State(app_state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(app_state.db.list_categories().await?))
}

pub async fn create_item(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let item = payload.validate()?;
    let created = app_state.db.create_item(&item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_item(
    State(app_state): State<AppState>,
    Path(sku): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> ApiResult<Json<InventoryItem>> {
    let sku = normalize_sku(&sku)?;
    let changes = payload.validate()?;
    Ok(Json(app_state.db.update_item(&sku, &changes).await?))
}

pub async fn adjust_stock(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(sku): Path<String>,
    Json(payload): Json<AdjustStockRequest>,
) -> ApiResult<Json<InventoryItem>> {
    let sku = normalize_sku(&sku)?;
    payload.validate()?;
    let item = app_state
        .db
        .adjust_stock(&sku, payload.delta, payload.reason.as_deref(), &user.email)
        .await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(sku): Path<String>,
) -> ApiResult<StatusCode> {
    user.ensure_admin()?;
    let sku = normalize_sku(&sku)?;
    app_state.db.delete_item(&sku).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list_items).post(create_item))
        .route("/api/inventory/categories", get(list_categories))
        .route(
            "/api/inventory/{sku}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/inventory/{sku}/adjust", post(adjust_stock))
}
