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
    db::models::{Message, MessageRole},
    error::{AppError, Result},
    AppState,
};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub pinned: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub project_id: Option<String>,
    pub role: Option<String>,
    pub content: Option<String>,
    pub quoted_message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMessageRequest {
    pub pinned: Option<bool>,
    pub content: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

async fn message_by_id(state: &AppState, id: &str) -> Result<Message> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("MESSAGE_NOT_FOUND", "Message not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let message = message_by_id(&state, &id).await?;
        return Ok(Json(message).into_response());
    }

    let project_id = query
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "Valid projectId is required"))?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let mut qb = QueryBuilder::new("SELECT * FROM messages WHERE project_id = ");
    qb.push_bind(project_id);
    if let Some(pinned) = query.pinned {
        // Any value other than the literal "true" filters for unpinned.
        qb.push(" AND pinned = ").push_bind(pinned == "true");
    }
    qb.push(" ORDER BY created_at DESC");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let messages: Vec<Message> = qb.build_query_as().fetch_all(&state.db.pool).await?;
    Ok(Json(messages).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse> {
    let project_id = body
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let role_raw = body
        .role
        .ok_or_else(|| AppError::validation("MISSING_ROLE", "role is required"))?;
    let role = MessageRole::parse(role_raw.trim()).ok_or_else(|| {
        AppError::validation("INVALID_ROLE", "role must be \"user\" or \"assistant\"")
    })?;

    let content = body
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_CONTENT", "content is required and cannot be empty")
        })?;

    let quoted_message_id = match body.quoted_message_id {
        Some(raw) if !raw.trim().is_empty() => Some(raw),
        Some(_) => {
            return Err(AppError::validation(
                "INVALID_QUOTED_MESSAGE_ID",
                "quotedMessageId must be a valid message id",
            ))
        }
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (id, project_id, role, content, quoted_message_id, pinned, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&project_id)
    .bind(role)
    .bind(content)
    .bind(&quoted_message_id)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn update(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Json(body): Json<UpdateMessageRequest>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    message_by_id(&state, &id).await?;

    let content = match body.content.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation(
                    "INVALID_CONTENT",
                    "content must be a non-empty string",
                ));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    if body.pinned.is_none() && content.is_none() {
        return Err(AppError::validation("NO_UPDATES", "No valid fields to update"));
    }

    let mut qb = QueryBuilder::new("UPDATE messages SET ");
    let mut separated = qb.separated(", ");
    if let Some(pinned) = body.pinned {
        separated.push("pinned = ").push_bind_unseparated(pinned);
    }
    if let Some(content) = content {
        separated.push("content = ").push_bind_unseparated(content);
    }
    qb.push(" WHERE id = ").push_bind(&id);
    qb.push(" RETURNING *");

    let message: Message = qb.build_query_as().fetch_one(&state.db.pool).await?;
    Ok(Json(message))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    message_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, Message>("DELETE FROM messages WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "Message deleted successfully",
        "deleted": deleted,
    })))
}
