//! Auth routes for login, logout, the current session and password changes

use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::middleware::ACCESS_TOKEN_COOKIE;
use crate::auth::models::{AuthUser, ChangePasswordRequest, LoginRequest, TokenResponse};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::database::models::UserAccount;
use crate::error::{ApiError, ApiResult};
use crate::routes::extractors::Json;
use crate::server::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Unknown email, wrong password and inactive account all get the same 401
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();

    let account = app_state
        .db
        .find_user_by_email(&email)
        .await?
        .filter(|account| account.is_active && verify_password(&payload.password, &account.password_hash))
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt for {}", email);
            ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

    let user = AuthUser {
        id: account.id,
        email: account.email,
        role: account.role,
    };
    let (access_token, expires_at) = app_state.jwt_service.create_token(&user)?;

    let cookie = session_cookie(
        access_token.clone(),
        time::Duration::seconds(app_state.jwt_service.ttl_seconds()),
    );

    tracing::info!("{} logged in as {}", user.email, user.role);
    Ok((jar.add(cookie), Json(TokenResponse::new(access_token, expires_at, user))))
}

/// Tokens are stateless; logging out only expires the cookie
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let expired = session_cookie(String::new(), time::Duration::ZERO);
    (StatusCode::NO_CONTENT, jar.add(expired))
}

fn session_cookie(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

pub async fn me(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UserAccount>> {
    let account = app_state
        .db
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account", user.id))?;
    Ok(Json(account))
}

pub async fn change_password(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    validate_password_strength(&payload.new_password)?;

    let account = app_state
        .db
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Account", user.id))?;
    if !verify_password(&payload.current_password, &account.password_hash) {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    app_state.db.update_password(user.id, &password_hash).await?;
    tracing::info!("{} changed their password", user.email);
    Ok(StatusCode::NO_CONTENT)
}

/// Routes reachable without a token
pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

/// Routes for the signed-in user; mounted behind the auth middleware
pub fn create_session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/password", put(change_password))
}
