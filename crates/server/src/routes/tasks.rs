use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    db::models::{Task, TaskStatus},
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub id: Option<String>,
    pub file_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub file_id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub status: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    TaskStatus::parse(raw).ok_or_else(|| {
        AppError::validation(
            "INVALID_STATUS",
            "status must be one of: pending, in_progress, completed",
        )
    })
}

async fn task_by_id(state: &AppState, id: &str) -> Result<Task> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("TASK_NOT_FOUND", "Task not found"))
}

async fn fetch(State(state): State<AppState>, Query(query): Query<TaskQuery>) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let task = task_by_id(&state, &id).await?;
        return Ok(Json(task).into_response());
    }

    let file_id = query
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let mut qb = QueryBuilder::new("SELECT * FROM tasks WHERE file_id = ");
    qb.push_bind(file_id);
    if let Some(raw) = query.status {
        let status = parse_status(&raw)?;
        qb.push(" AND status = ").push_bind(status);
    }
    qb.push(" ORDER BY created_at DESC");

    let tasks: Vec<Task> = qb.build_query_as().fetch_all(&state.db.pool).await?;
    Ok(Json(tasks).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse> {
    let file_id = body
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_TITLE", "title is required and cannot be empty")
        })?;

    let status = match body.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => TaskStatus::Pending,
    };

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (id, file_id, title, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&file_id)
    .bind(title)
    .bind(status)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

async fn update(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    task_by_id(&state, &id).await?;

    let title = match body.title.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("INVALID_TITLE", "title cannot be empty"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let status = match body.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let mut qb = QueryBuilder::new("UPDATE tasks SET updated_at = ");
    qb.push_bind(Utc::now());
    if let Some(title) = title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(status) = status {
        qb.push(", status = ").push_bind(status);
    }
    qb.push(" WHERE id = ").push_bind(&id);
    qb.push(" RETURNING *");

    let task: Task = qb.build_query_as().fetch_one(&state.db.pool).await?;
    Ok(Json(task))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    task_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, Task>("DELETE FROM tasks WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "Task deleted successfully",
        "task": deleted,
    })))
}
