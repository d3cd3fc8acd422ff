// src/models/task.rs
use ai_todo::Task;
use serde::Deserialize;
use sqlx::FromRow;

/// A task as stored in the per-user `tasks` collection.
#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: String,
    pub user_id: i32,
    pub title: String,
    pub completed: bool,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            completed: row.completed,
            due_date: row.due_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Client-generated id; the server makes one when absent.
    pub id: Option<String>,
    pub title: String,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTasksRequest {
    pub tasks: Vec<Task>,
}
