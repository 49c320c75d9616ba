//! Account administration. Every route here sits behind `require_admin`.

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::database::models::UserAccount;
use crate::error::{ApiError, ApiResult};
use crate::routes::extractors::{Json, Path};
use crate::server::AppState;
use crate::state_structs::{CreateAccountRequest, UpdateAccountRequest};

pub async fn list_accounts(State(app_state): State<AppState>) -> ApiResult<Json<Vec<UserAccount>>> {
    Ok(Json(app_state.db.list_users().await?))
}

pub async fn create_account(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<UserAccount>)> {
    let (email, full_name) = payload.validate()?;
    let password_hash = hash_password(&payload.password)?;
    let account = app_state
        .db
        .create_user(&email, &password_hash, &full_name, payload.role)
        .await?;
    tracing::info!("{} created account {} ({})", admin.email, account.email, account.role);
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_account(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult<Json<UserAccount>> {
    payload.check_self_update(admin.id, id)?;
    let account = app_state.db.update_user(id, &payload).await?;
    tracing::info!("{} updated account {}", admin.email, account.email);
    Ok(Json(account))
}

pub async fn delete_account(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if admin.id == id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }
    app_state.db.delete_user(id).await?;
    tracing::info!("{} deleted account {}", admin.email, id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route("/api/accounts/{id}", put(update_account).delete(delete_account))
}
