use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::database::models::{Customer, CustomerSummary};
use crate::error::ApiResult;
use crate::routes::extractors::{Json, Path, Query};
use crate::server::AppState;
use crate::services::stock::optional_text;
use crate::state_structs::{CustomerQuery, CustomerRequest, escape_like, page_size};

pub async fn list_customers(
    State(app_state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<CustomerSummary>>> {
    let pattern = optional_text(query.search).map(|term| format!("%{}%", escape_like(&term)));
    let customers = app_state
        .db
        .list_customers(pattern.as_deref(), page_size(query.limit))
        .await?;
    Ok(Json(customers))
}

/// Customer with order count and lifetime spend
pub async fn get_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CustomerSummary>> {
    Ok(Json(app_state.db.get_customer(id).await?))
}

pub async fn create_customer(
    State(app_state): State<AppState>,
    Json(payload): Json<CustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = payload.validate()?;
    let created = app_state.db.create_customer(&customer).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerRequest>,
) -> ApiResult<Json<Customer>> {
    let customer = payload.validate()?;
    Ok(Json(app_state.db.update_customer(id, &customer).await?))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/{id}", get(get_customer).put(update_customer))
}
