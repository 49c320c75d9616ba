//! The signed-in user's notification inbox. The frontend polls
//! `unread-count`; there is no push channel.

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::database::models::Notification;
use crate::error::ApiResult;
use crate::routes::extractors::{Json, Path, Query};
use crate::server::AppState;
use crate::state_structs::{CountResponse, NotificationQuery, UpdatedResponse, page_size};

pub async fn list_notifications(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = app_state
        .db
        .list_notifications(user.id, query.unread_only, page_size(query.limit))
        .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<CountResponse>> {
    let count = app_state.db.unread_count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn mark_read(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    app_state.db.mark_notification_read(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = app_state.db.mark_all_read(user.id).await?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn delete_notification(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    app_state.db.delete_notification(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", put(mark_all_read))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}
