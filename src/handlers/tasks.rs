use crate::middleware::auth::auth_middleware;
use crate::models::auth::{Claims, ErrorResponse};
use crate::models::task::*;
use crate::AppState;
use ai_todo::Task;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch},
    Router,
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

type ApiError = (StatusCode, Json<ErrorResponse>);

const TASK_COLUMNS: &str = "id, user_id, title, completed, due_date, created_at";

pub fn task_routes() -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task).put(replace_tasks))
        .route("/api/tasks/:id/toggle", patch(toggle_task))
        .route("/api/tasks/:id", delete(delete_task))
        .layer(axum::middleware::from_fn(auth_middleware))
}

fn caller_id(claims: &Claims) -> Result<i32, ApiError> {
    claims.user_id().ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or expired token")),
        )
    })
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> ApiError {
    move |e| {
        tracing::error!("Database error {}: {}", context, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal server error")),
        )
    }
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Task not found")))
}

/// Blank titles are dropped and later duplicates of an id lose to the first.
pub fn normalize_replacement(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| !task.title.trim().is_empty())
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}

async fn list_tasks(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;

    let rows: Vec<TaskRow> = sqlx::query_as(&format!(
        "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY created_at ASC",
        TASK_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&state.db_pool)
    .await
    .map_err(db_error("listing tasks"))?;

    let tasks: Vec<Task> = rows.into_iter().map(Task::from).collect();
    Ok(Json(json!({ "success": true, "tasks": tasks })))
}

async fn create_task(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Task title is required")),
        ));
    }

    let mut task = Task::new(title, payload.due_date, Utc::now());
    if let Some(id) = payload.id.filter(|id| !id.trim().is_empty()) {
        task.id = id;
    }

    let row: TaskRow = sqlx::query_as(&format!(
        "INSERT INTO tasks (id, user_id, title, completed, due_date, created_at)
         VALUES ($1, $2, $3, FALSE, $4, $5)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(&task.id)
    .bind(user_id)
    .bind(&task.title)
    .bind(task.due_date)
    .bind(task.created_at)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return (
                    StatusCode::CONFLICT,
                    Json(ErrorResponse::new("A task with this id already exists")),
                );
            }
        }
        db_error("creating task")(e)
    })?;

    Ok(Json(json!({ "success": true, "task": Task::from(row) })))
}

async fn toggle_task(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;

    let row: TaskRow = sqlx::query_as(&format!(
        "UPDATE tasks SET completed = NOT completed WHERE user_id = $1 AND id = $2 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(user_id)
    .bind(&id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(db_error("toggling task"))?
    .ok_or_else(not_found)?;

    Ok(Json(json!({ "success": true, "task": Task::from(row) })))
}

async fn delete_task(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;

    let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(&id)
        .execute(&state.db_pool)
        .await
        .map_err(db_error("deleting task"))?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(Json(json!({ "success": true, "message": "Task deleted" })))
}

/// Overwrites the caller's whole collection in one transaction.
async fn replace_tasks(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ReplaceTasksRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&claims)?;
    let tasks = normalize_replacement(payload.tasks);

    let mut tx = state
        .db_pool
        .begin()
        .await
        .map_err(db_error("starting task replacement"))?;

    sqlx::query("DELETE FROM tasks WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("clearing tasks"))?;

    for task in &tasks {
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, completed, due_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&task.id)
        .bind(user_id)
        .bind(&task.title)
        .bind(task.completed)
        .bind(task.due_date)
        .bind(task.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("inserting task"))?;
    }

    tx.commit().await.map_err(db_error("committing task replacement"))?;
    tracing::info!("Replaced task set for user {} ({} tasks)", user_id, tasks.len());

    Ok(Json(json!({ "success": true, "tasks": tasks })))
}
