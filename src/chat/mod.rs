// Chat transcript model
// Persisted records hold one (user message, assistant response) pair; the widget shows them as turns

pub mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use service::{ChatBackend, ChatService};

pub const SIGNED_OUT_GREETING: &str = "hello.";
pub const EMPTY_HISTORY_GREETING: &str = "Hi there! How can I help you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Only ever sent upstream by the relay, never shown or stored.
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Message shape the completion relay accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub role: ChatRole,
    pub content: String,
}

impl From<&ChatMessage> for RelayMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReply {
    pub content: String,
    pub role: ChatRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub message: String,
    #[serde(default)]
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// Expands stored records into display turns, oldest first.
/// Each record becomes a user turn plus an assistant turn when a response was saved.
pub fn expand_records(mut records: Vec<ChatRecord>) -> Vec<ChatMessage> {
    records.sort_by_key(|record| record.timestamp);

    let mut messages = Vec::with_capacity(records.len() * 2);
    for record in records {
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: record.message,
            timestamp: record.timestamp,
        });
        if !record.response.is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: record.response,
                timestamp: record.timestamp,
            });
        }
    }

    if messages.is_empty() {
        messages.push(ChatMessage::assistant(EMPTY_HISTORY_GREETING));
    }
    messages
}
