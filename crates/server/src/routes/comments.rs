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
    db::models::Comment,
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub id: Option<String>,
    pub file_id: Option<String>,
    pub resolved: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub file_id: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub parent_comment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub resolved: Option<bool>,
    pub content: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

async fn comment_by_id(state: &AppState, id: &str) -> Result<Comment> {
    sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("NOT_FOUND", "Comment not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let comment = comment_by_id(&state, &id).await?;
        return Ok(Json(comment).into_response());
    }

    let file_id = query
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let mut qb = QueryBuilder::new("SELECT * FROM comments WHERE file_id = ");
    qb.push_bind(file_id);
    if let Some(resolved) = query.resolved {
        qb.push(" AND resolved = ").push_bind(resolved == "true");
    }
    qb.push(" ORDER BY created_at ASC");

    let comments: Vec<Comment> = qb.build_query_as().fetch_all(&state.db.pool).await?;
    Ok(Json(comments).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse> {
    let file_id = body
        .file_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_FILE_ID", "fileId is required"))?;

    let author = body
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_AUTHOR", "author is required and cannot be empty")
        })?;

    let content = body
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_CONTENT", "content is required and cannot be empty")
        })?;

    let parent_comment_id = match body.parent_comment_id {
        Some(raw) if !raw.trim().is_empty() => Some(raw),
        Some(_) => {
            return Err(AppError::validation(
                "INVALID_PARENT_COMMENT_ID",
                "parentCommentId must be a valid comment id",
            ))
        }
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, file_id, parent_comment_id, author, content, resolved, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&file_id)
    .bind(&parent_comment_id)
    .bind(author)
    .bind(content)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
    Json(body): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    comment_by_id(&state, &id).await?;

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

    if body.resolved.is_none() && content.is_none() {
        return Err(AppError::validation(
            "NO_UPDATE_FIELDS",
            "No valid fields to update",
        ));
    }

    let mut qb = QueryBuilder::new("UPDATE comments SET ");
    let mut separated = qb.separated(", ");
    if let Some(resolved) = body.resolved {
        separated.push("resolved = ").push_bind_unseparated(resolved);
    }
    if let Some(content) = content {
        separated.push("content = ").push_bind_unseparated(content);
    }
    qb.push(" WHERE id = ").push_bind(&id);
    qb.push(" RETURNING *");

    let comment: Comment = qb.build_query_as().fetch_one(&state.db.pool).await?;
    Ok(Json(comment))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    comment_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, Comment>("DELETE FROM comments WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "Comment deleted successfully",
        "comment": deleted,
    })))
}
