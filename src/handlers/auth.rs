use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::strict_rate_limit_middleware;
use crate::models::auth::*;
use crate::AppState;
use ai_todo::session::is_valid_email;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use std::sync::Arc;

pub const MIN_PASSWORD_LEN: usize = 6;
const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
}

pub fn auth_routes() -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .layer(axum::middleware::from_fn(strict_rate_limit_middleware));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(me))
        .layer(axum::middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}

pub fn validate_registration(payload: &RegisterRequest) -> Result<(), &'static str> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err("Email and password are required");
    }
    if !is_valid_email(&payload.email) {
        return Err("Please enter a valid email address");
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 6 characters long");
    }
    Ok(())
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if let Err(message) = validate_registration(&payload) {
        return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))));
    }
    let email = payload.email.trim().to_lowercase();
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let existing_user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error checking existing user: {}", e);
            internal_error()
        })?;
    if existing_user.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("User with this email already exists")),
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        internal_error()
    })?;

    // Self-registered accounts are always regular users; admins come from create_admin
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, password_hash, role, created_at, updated_at)
         VALUES ($1, $2, $3, 'user', NOW(), NOW())
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Error creating user: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to create user")),
        )
    })?;

    tracing::info!("Registered user {}", user.id);
    let token = generate_jwt_token(&user, &state.config.jwt_secret)?;
    let role = user.role();

    Ok(Json(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        user: UserResponse::from(user),
        token,
        dashboard: role.dashboard_route(),
    }))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Email and password are required")),
        ));
    }

    let invalid_credentials = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid email or password")),
        )
    };

    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
        .bind(payload.email.trim().to_lowercase())
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error finding user: {}", e);
            internal_error()
        })?
        .ok_or_else(invalid_credentials)?;

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(invalid_credentials()),
        Err(e) => {
            tracing::error!("Error verifying password: {}", e);
            return Err(internal_error());
        }
    }

    let token = generate_jwt_token(&user, &state.config.jwt_secret)?;
    let role = user.role();

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        user: UserResponse::from(user),
        token,
        dashboard: role.dashboard_route(),
    }))
}

/// Resolves the session's user and role; the client routes on `dashboard`.
async fn me(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = claims.user_id().ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or expired token")),
        )
    })?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error finding user: {}", e);
            internal_error()
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new("User not found"))))?;

    let role = user.role();
    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(user),
        "dashboard": role.dashboard_route()
    })))
}

pub fn generate_jwt_token(user: &User, secret: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role(),
        exp: (now + Duration::hours(24)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Error generating JWT token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to generate authentication token")),
        )
    })
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
