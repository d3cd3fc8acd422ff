// src/models/chat.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted chat turn: the user's message and the assistant's reply.
#[derive(Debug, FromRow)]
pub struct ChatRecordRow {
    pub id: i64,
    pub user_id: i32,
    pub message: String,
    pub response: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatRecordResponse {
    pub id: i64,
    pub message: String,
    pub response: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<ChatRecordRow> for ChatRecordResponse {
    fn from(row: ChatRecordRow) -> Self {
        ChatRecordResponse {
            id: row.id,
            message: row.message,
            response: row.response,
            timestamp: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendChatRequest {
    pub message: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct RelayError {
    pub error: String,
}

impl RelayError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
