use crate::handlers::auth::verify_jwt_token;
use crate::models::auth::ErrorResponse;
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;
    auth_str
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or("Invalid Authorization header format. Expected 'Bearer <token>'")
}

pub async fn auth_middleware(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(message) => {
            return Err((StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))));
        }
    };

    let claims = match verify_jwt_token(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid or expired token")),
            ));
        }
    };

    // Handlers read the caller's identity from the request extensions
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
