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
use uuid::Uuid;

use crate::{
    db::models::Version,
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    pub id: Option<String>,
    pub file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVersionRequest {
    pub file_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

async fn version_by_id(state: &AppState, id: &str) -> Result<Version> {
    sqlx::query_as::<_, Version>("SELECT * FROM versions WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("VERSION_NOT_FOUND", "Version not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<VersionQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let version = version_by_id(&state, &id).await?;
        return Ok(Json(version).into_response());
    }

    let file_id = query
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let versions = sqlx::query_as::<_, Version>(
        "SELECT * FROM versions WHERE file_id = ? ORDER BY created_at DESC",
    )
    .bind(file_id)
    .fetch_all(&state.db.pool)
    .await?;
    Ok(Json(versions).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateVersionRequest>,
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

    let author = body
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_AUTHOR", "author is required and cannot be empty")
        })?;

    // A version is a full snapshot; empty content is still a snapshot.
    let content = body
        .content
        .ok_or_else(|| AppError::validation("MISSING_CONTENT", "content is required"))?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let version = sqlx::query_as::<_, Version>(
        r#"
        INSERT INTO versions (id, file_id, title, author, content, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&file_id)
    .bind(title)
    .bind(author)
    .bind(&content)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(version)))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<VersionQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    version_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, Version>("DELETE FROM versions WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "Version deleted successfully",
        "version": deleted,
    })))
}
