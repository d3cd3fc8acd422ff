// HTTP client for the ai_todo server: identity, completion relay, transcripts and task sync
use crate::chat::{ChatBackend, ChatRecord, RelayMessage, RelayReply};
use crate::error::{AppError, Result};
use crate::session::{AuthBackend, Session, User};
use crate::sync::TaskBackend;
use crate::tasks::{FileStorage, Task, TaskStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub storage_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            storage_dir: PathBuf::from(".ai_todo"),
        }
    }
}

impl ClientConfig {
    /// Opens this device's task store under `storage_dir`, creating the directory if needed.
    pub fn open_task_store(&self) -> Result<TaskStore<FileStorage>> {
        TaskStore::load(FileStorage::new(&self.storage_dir)?)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct AuthEnvelope {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct RecordsEnvelope {
    records: Vec<ChatRecord>,
}

#[derive(Deserialize)]
struct TasksEnvelope {
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    messages: &'a [RelayMessage],
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.timeout(Duration::from_secs(60)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Turns a non-2xx response into `AppError::Upstream`, keeping the server's message.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);

        tracing::warn!("Server returned {}: {}", status, message);
        Err(AppError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let envelope: AuthEnvelope = self
            .send_json(
                self.client
                    .post(self.url("/api/auth/login"))
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        Ok(Session { token: envelope.token, user: envelope.user })
    }

    async fn sign_up(&self, email: &str, password: &str, name: Option<&str>) -> Result<Session> {
        let envelope: AuthEnvelope = self
            .send_json(
                self.client
                    .post(self.url("/api/auth/register"))
                    .json(&json!({ "email": email, "password": password, "name": name })),
            )
            .await?;
        Ok(Session { token: envelope.token, user: envelope.user })
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn complete(&self, token: &str, messages: &[RelayMessage]) -> Result<RelayReply> {
        self.send_json(
            self.client
                .post(self.url("/api/chat"))
                .bearer_auth(token)
                .json(&RelayRequest { messages }),
        )
        .await
    }

    async fn append_record(&self, token: &str, message: &str, response: &str) -> Result<()> {
        let _: Value = self
            .send_json(
                self.client
                    .post(self.url("/api/chats"))
                    .bearer_auth(token)
                    .json(&json!({ "message": message, "response": response })),
            )
            .await?;
        Ok(())
    }

    async fn records(&self, token: &str) -> Result<Vec<ChatRecord>> {
        let envelope: RecordsEnvelope = self
            .send_json(self.client.get(self.url("/api/chats")).bearer_auth(token))
            .await?;
        Ok(envelope.records)
    }
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>> {
        let envelope: TasksEnvelope = self
            .send_json(self.client.get(self.url("/api/tasks")).bearer_auth(token))
            .await?;
        Ok(envelope.tasks)
    }

    async fn replace_tasks(&self, token: &str, tasks: &[Task]) -> Result<()> {
        let _: Value = self
            .send_json(
                self.client
                    .put(self.url("/api/tasks"))
                    .bearer_auth(token)
                    .json(&json!({ "tasks": tasks })),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserRole;

    #[test]
    fn test_base_url_is_normalised() {
        let client = ApiClient::new(&ClientConfig {
            base_url: "https://todo.example.com/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.url("/api/chat"), "https://todo.example.com/api/chat");
    }

    #[test]
    fn test_task_store_lives_in_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            storage_dir: dir.path().join("device"),
            ..Default::default()
        };

        let mut store = config.open_task_store().unwrap();
        store.add("Call the plumber", None).unwrap();
        assert!(dir.path().join("device").join("tasks.json").exists());

        let reopened = config.open_task_store().unwrap();
        assert_eq!(reopened.tasks(), store.tasks());
    }

    #[test]
    fn test_auth_envelope_tolerates_extra_fields() {
        let raw = r#"{
            "success": true,
            "message": "Login successful",
            "token": "abc",
            "dashboard": "/admin",
            "user": {"id": 1, "email": "a@b.co", "name": null, "role": "admin", "created_at": "2026-01-01T00:00:00Z"}
        }"#;
        let envelope: AuthEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.token, "abc");
        assert_eq!(envelope.user.role, UserRole::Admin);
    }
}
