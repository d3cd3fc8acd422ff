use crate::models::auth::{Claims, ErrorResponse};
use ai_todo::UserRole;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

/// Must sit inside `auth_middleware`, which supplies the claims.
pub async fn admin_middleware(
    request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let caller = request
        .extensions()
        .get::<Claims>()
        .map(|claims| (claims.role, claims.sub.clone()));

    match caller {
        Some((UserRole::Admin, _)) => Ok(next.run(request).await),
        Some((_, user_id)) => {
            tracing::warn!("User {} attempted to reach an admin endpoint", user_id);
            Err((
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Admin access required.")),
            ))
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required for admin access.")),
        )),
    }
}
