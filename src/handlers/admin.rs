use crate::middleware::admin::admin_middleware;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::*;
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn admin_routes() -> Router {
    Router::new()
        .route("/api/admin/users", get(admin_users_api))
        .layer(axum::middleware::from_fn(admin_middleware))
        .layer(axum::middleware::from_fn(auth_middleware))
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

impl UsersQuery {
    /// (page, limit, offset), with page starting at 1 and limit clamped.
    /// Pages past the end saturate the offset, which just yields an empty page.
    pub fn window(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit, (page - 1).saturating_mul(limit))
    }
}

fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

pub async fn admin_users_api(
    Query(params): Query<UsersQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let (page, limit, offset) = params.window();
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));

    let db_error = |e: sqlx::Error| {
        tracing::error!("Database error listing users: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal server error")),
        )
    };

    // A NULL pattern matches every row, so one query covers both cases
    let users: Vec<User> = sqlx::query_as(
        "SELECT id, email, name, password_hash, role, created_at, updated_at FROM users
         WHERE $1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db_pool)
    .await
    .map_err(db_error)?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE $1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1",
    )
    .bind(&search)
    .fetch_one(&state.db_pool)
    .await
    .map_err(db_error)?;

    let user_responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "users": user_responses,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "total_pages": total_pages(total, limit)
        }
    })))
}
