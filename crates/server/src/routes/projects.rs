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
    db::models::{Project, ProjectStatus},
    error::{AppError, Result},
    AppState,
};

const DEFAULT_LIST_LIMIT: i64 = 10;
const MAX_LIST_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(fetch).post(create).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub status: Option<String>,
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

fn parse_status(raw: &str) -> Result<ProjectStatus> {
    ProjectStatus::parse(raw).ok_or_else(|| {
        AppError::validation("INVALID_STATUS", "status must be \"saved\" or \"unsaved\"")
    })
}

async fn project_by_id(state: &AppState, id: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::not_found("PROJECT_NOT_FOUND", "Project not found"))
}

async fn fetch(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let project = project_by_id(&state, &id).await?;
        return Ok(Json(project).into_response());
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let mut qb = QueryBuilder::new("SELECT * FROM projects");
    if let Some(search) = query.search.filter(|s| !s.is_empty()) {
        qb.push(" WHERE name LIKE ")
            .push_bind(format!("%{search}%"));
    }
    qb.push(" ORDER BY created_at ASC");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let projects: Vec<Project> = qb.build_query_as().fetch_all(&state.db.pool).await?;
    Ok(Json(projects).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_NAME", "name is required and cannot be empty")
        })?;

    let status = match body.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => ProjectStatus::Unsaved,
    };

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (id, name, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(status)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn update(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    project_by_id(&state, &id).await?;

    let name = match body.name.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("INVALID_NAME", "name cannot be empty"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    let status = match body.status.as_deref() {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let mut qb = QueryBuilder::new("UPDATE projects SET updated_at = ");
    qb.push_bind(Utc::now());
    if let Some(name) = name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(status) = status {
        qb.push(", status = ").push_bind(status);
    }
    qb.push(" WHERE id = ").push_bind(&id);
    qb.push(" RETURNING *");

    let project: Project = qb.build_query_as().fetch_one(&state.db.pool).await?;
    Ok(Json(project))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;
    project_by_id(&state, &id).await?;

    let deleted = sqlx::query_as::<_, Project>("DELETE FROM projects WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "Project deleted successfully",
        "project": deleted,
    })))
}
