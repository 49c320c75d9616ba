//! Authentication Middleware
//!
//! Axum middleware for JWT token validation and role checks.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::auth::{jwt::JwtService, models::AuthUser};
use crate::error::ApiError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Middleware function for validating JWT tokens
    pub async fn validate_token(
        State(jwt_service): State<Arc<JwtService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, ApiError> {
        let token = extract_token(req.headers()).ok_or_else(|| {
            tracing::warn!(
                "[AuthMiddleware] Missing credentials for {} {}",
                req.method(),
                req.uri()
            );
            ApiError::Unauthorized("Missing access token".to_string())
        })?;

        let claims = jwt_service.decode_claims(&token).map_err(|e| {
            tracing::warn!("[AuthMiddleware] JWT validation failed: {:?}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let auth_user = AuthUser::from(claims);
        tracing::debug!(
            "[AuthMiddleware] Authenticated {} ({}) for {} {}",
            auth_user.email,
            auth_user.role,
            req.method(),
            req.uri()
        );

        req.extensions_mut().insert(auth_user);
        Ok(next.run(req).await)
    }

    /// Rejects requests whose authenticated user is not an admin.
    /// Must run inside `validate_token`.
    pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
        match req.extensions().get::<AuthUser>() {
            Some(user) if user.is_admin() => Ok(next.run(req).await),
            Some(user) => {
                tracing::warn!(
                    "[AuthMiddleware] {} denied admin route {}",
                    user.email,
                    req.uri()
                );
                Err(ApiError::Forbidden("Administrator role required".to_string()))
            }
            None => Err(ApiError::Unauthorized("Missing access token".to_string())),
        }
    }
}

/// Bearer header first, then the `access_token` cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(ACCESS_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|token| !token.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn cookie_is_used_as_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=xyz; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn non_bearer_schemes_and_lookalike_cookies_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token_old=stale"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn cookie_found_across_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("access_token=second"));
        assert_eq!(extract_token(&headers).as_deref(), Some("second"));

        headers.insert(header::COOKIE, HeaderValue::from_static("access_token="));
        assert_eq!(extract_token(&headers), None);
    }
}
