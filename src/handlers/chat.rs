use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::completion_rate_limit_middleware;
use crate::models::auth::{Claims, ErrorResponse};
use crate::models::chat::*;
use crate::AppState;
use ai_todo::chat::{ChatRole, RelayMessage, RelayReply};
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub const KEY_NOT_CONFIGURED: &str = "OpenAI API key is not configured";
pub const INVALID_REQUEST: &str = "Invalid request format";

pub fn chat_routes() -> Router {
    let relay = Router::new()
        .route("/api/chat", post(relay_completion))
        .layer(axum::middleware::from_fn(completion_rate_limit_middleware))
        .layer(axum::middleware::from_fn(auth_middleware));

    let transcripts = Router::new()
        .route("/api/chats", post(append_record).get(list_records))
        .layer(axum::middleware::from_fn(auth_middleware));

    relay.merge(transcripts)
}

/// `{ "messages": [...] }` with every entry a `{role, content}` pair, or nothing.
pub fn parse_relay_messages(body: &[u8]) -> Option<Vec<RelayMessage>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let messages = value.get("messages")?.as_array()?;
    messages
        .iter()
        .map(|m| serde_json::from_value::<RelayMessage>(m.clone()).ok())
        .collect()
}

fn relay_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<RelayError>) {
    (status, Json(RelayError::new(message)))
}

/// Forwards the caller's turns to the completion API. Key check comes before body validation.
async fn relay_completion(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<RelayReply>, (StatusCode, Json<RelayError>)> {
    let client = state
        .completion_client
        .as_ref()
        .ok_or_else(|| relay_error(StatusCode::INTERNAL_SERVER_ERROR, KEY_NOT_CONFIGURED))?;

    let messages = parse_relay_messages(&body)
        .ok_or_else(|| relay_error(StatusCode::BAD_REQUEST, INVALID_REQUEST))?;

    tracing::debug!("Relaying {} messages for user {}", messages.len(), claims.sub);

    let content = client.complete(messages).await.map_err(|e| {
        tracing::error!("Completion relay failed: {}", e);
        relay_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;

    Ok(Json(RelayReply {
        content,
        role: ChatRole::Assistant,
    }))
}

fn caller_id(claims: &Claims) -> Result<i32, (StatusCode, Json<ErrorResponse>)> {
    claims.user_id().ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or expired token")),
        )
    })
}

async fn append_record(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AppendChatRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = caller_id(&claims)?;
    if payload.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Message is required")),
        ));
    }

    let row: ChatRecordRow = sqlx::query_as(
        "INSERT INTO chats (user_id, message, response, created_at)
         VALUES ($1, $2, $3, NOW())
         RETURNING id, user_id, message, response, created_at",
    )
    .bind(user_id)
    .bind(&payload.message)
    .bind(&payload.response)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store chat record: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to save chat")),
        )
    })?;

    Ok(Json(json!({
        "success": true,
        "record": ChatRecordResponse::from(row)
    })))
}

async fn list_records(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = caller_id(&claims)?;

    let rows: Vec<ChatRecordRow> = sqlx::query_as(
        "SELECT id, user_id, message, response, created_at FROM chats
         WHERE user_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load chat history: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to load chat history")),
        )
    })?;

    let records: Vec<ChatRecordResponse> = rows.into_iter().map(ChatRecordResponse::from).collect();
    Ok(Json(json!({ "success": true, "records": records })))
}
