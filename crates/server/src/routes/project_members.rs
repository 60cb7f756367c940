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
    db::models::{MemberRole, ProjectMember},
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMemberRequest {
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

async fn member_by_id(state: &AppState, id: &str) -> Result<ProjectMember> {
    sqlx::query_as::<_, ProjectMember>("SELECT * FROM project_members WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("MEMBER_NOT_FOUND", "Project member not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<MemberQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let member = member_by_id(&state, &id).await?;
        return Ok(Json(member).into_response());
    }

    let project_id = query
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let members = sqlx::query_as::<_, ProjectMember>(
        "SELECT * FROM project_members WHERE project_id = ? ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.db.pool)
    .await?;
    Ok(Json(members).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse> {
    let project_id = body
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let user_id = body
        .user_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_USER_ID", "userId is required"))?;

    let role = match body.role.as_deref() {
        Some(raw) => MemberRole::parse(raw).ok_or_else(|| {
            AppError::validation("INVALID_ROLE", "role must be one of: owner, editor, viewer")
        })?,
        None => MemberRole::Viewer,
    };

    let id = Uuid::new_v4().to_string();

    // A user may hold several rows in the same project; deduplication is the
    // caller's concern.
    let member = sqlx::query_as::<_, ProjectMember>(
        r#"
        INSERT INTO project_members (id, project_id, user_id, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&project_id)
    .bind(&user_id)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<MemberQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    member_by_id(&state, &id).await?;

    let deleted =
        sqlx::query_as::<_, ProjectMember>("DELETE FROM project_members WHERE id = ? RETURNING *")
            .bind(&id)
            .fetch_one(&state.db.pool)
            .await?;

    Ok(Json(json!({
        "message": "Project member removed successfully",
        "member": deleted,
    })))
}
