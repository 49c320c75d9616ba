use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::database::models::{InventoryItem, Supplier};
use crate::error::ApiResult;
use crate::routes::extractors::{Json, Path};
use crate::server::AppState;
use crate::state_structs::SupplierRequest;

pub async fn list_suppliers(State(app_state): State<AppState>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(app_state.db.list_suppliers().await?))
}

pub async fn get_supplier(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(app_state.db.get_supplier(id).await?))
}

pub async fn create_supplier(
    State(app_state): State<AppState>,
    Json(payload): Json<SupplierRequest>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = payload.validate()?;
    let created = app_state.db.create_supplier(&supplier).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_supplier(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SupplierRequest>,
) -> ApiResult<Json<Supplier>> {
    let supplier = payload.validate()?;
    Ok(Json(app_state.db.update_supplier(id, &supplier).await?))
}

pub async fn delete_supplier(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    app_state.db.delete_supplier(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Inventory supplied by one supplier
pub async fn supplier_items(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(app_state.db.items_by_supplier(id).await?))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/api/suppliers/{id}",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/api/suppliers/{id}/items", get(supplier_items))
}
