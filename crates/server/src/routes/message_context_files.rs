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
    db::models::MessageContextFile,
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFileQuery {
    pub id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateContextFileRequest {
    pub message_id: Option<String>,
    pub file_id: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

async fn record_by_id(state: &AppState, id: &str) -> Result<MessageContextFile> {
    sqlx::query_as::<_, MessageContextFile>("SELECT * FROM message_context_files WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("NOT_FOUND", "Record not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<ContextFileQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let record = record_by_id(&state, &id).await?;
        return Ok(Json(record).into_response());
    }

    if let Some(message_id) = query.message_id.filter(|v| !v.is_empty()) {
        let records = sqlx::query_as::<_, MessageContextFile>(
            "SELECT * FROM message_context_files WHERE message_id = ? ORDER BY created_at ASC",
        )
        .bind(message_id)
        .fetch_all(&state.db.pool)
        .await?;
        return Ok(Json(records).into_response());
    }

    Err(AppError::validation(
        "MISSING_PARAMETER",
        "Either id or messageId is required",
    ))
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateContextFileRequest>,
) -> Result<impl IntoResponse> {
    let message_id = body
        .message_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_MESSAGE_ID", "messageId is required"))?;

    let file_id = body
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let id = Uuid::new_v4().to_string();

    let record = sqlx::query_as::<_, MessageContextFile>(
        r#"
        INSERT INTO message_context_files (id, message_id, file_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&message_id)
    .bind(&file_id)
    .bind(Utc::now())
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<ContextFileQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    record_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, MessageContextFile>(
        "DELETE FROM message_context_files WHERE id = ? RETURNING *",
    )
    .bind(&id)
    .fetch_one(&state.db.pool)
    .await?;

    Ok(Json(json!({
        "message": "Record deleted successfully",
        "deletedRecord": deleted,
    })))
}
