use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    db::models::{DocFormat, FileKind, FileNode, FileStatus, OwnerType},
    db::Database,
    error::{AppError, Result},
    policy::{can_mutate, ParentLookup},
    AppState,
};

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(fetch).post(create).put(update).delete(remove))
        .route("/upload", post(upload))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub owner_type: Option<String>,
    pub user_id: Option<String>,
    pub parent_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateFileRequest {
    pub project_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub owner_type: Option<String>,
    pub parent_id: Option<String>,
    pub file_type: Option<String>,
    pub content: Option<String>,
    pub owner_id: Option<String>,
    pub status: Option<String>,
}

/// Each field is independently settable; `parentId` and `fileType`
/// distinguish "absent" from an explicit null, which clears the value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub file_type: Option<Option<String>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de).map(Some)
    }
}

fn require_id(id: Option<String>) -> Result<String> {
    id.filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::validation("INVALID_ID", "Valid ID is required"))
}

/// Resolves a proposed parent id to the lookup the policy decides on.
async fn resolve_parent(db: &Database, parent_id: Option<&str>) -> Result<ParentLookup> {
    let Some(parent_id) = parent_id else {
        return Ok(ParentLookup::Root);
    };
    match db.file_by_id(parent_id).await? {
        Some(parent) => Ok(ParentLookup::Found {
            owner_type: parent.owner_type,
            kind: parent.kind,
        }),
        None => Ok(ParentLookup::Missing),
    }
}

async fn fetch(State(state): State<AppState>, Query(query): Query<FileQuery>) -> Result<Response> {
    // Single file fetch by id
    if let Some(id) = query.id {
        let id = require_id(Some(id))?;
        let file = state
            .db
            .file_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("FILE_NOT_FOUND", "File not found"))?;
        return Ok(Json(file).into_response());
    }

    // List with filters and bounded pagination
    let project_id = query
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let mut qb = QueryBuilder::new("SELECT * FROM files WHERE project_id = ");
    qb.push_bind(project_id);

    if let Some(raw) = query.owner_type {
        let owner_type = OwnerType::parse(&raw).ok_or_else(|| {
            AppError::validation("INVALID_OWNER_TYPE", "ownerType must be \"team\" or \"private\"")
        })?;
        qb.push(" AND owner_type = ").push_bind(owner_type);
    }

    if let Some(user_id) = query.user_id.filter(|v| !v.is_empty()) {
        qb.push(" AND owner_id = ").push_bind(user_id);
    }

    if let Some(parent_id) = query.parent_id {
        // An empty or literal "null" value selects the forest roots.
        if parent_id.is_empty() || parent_id == "null" {
            qb.push(" AND parent_id IS NULL");
        } else {
            qb.push(" AND parent_id = ").push_bind(parent_id);
        }
    }

    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let files: Vec<FileNode> = qb.build_query_as().fetch_all(&state.db.pool).await?;
    Ok(Json(files).into_response())
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateFileRequest>,
) -> Result<impl IntoResponse> {
    let project_id = body
        .project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AppError::validation("MISSING_NAME", "name is required and cannot be empty")
        })?;

    let kind_raw = body
        .kind
        .ok_or_else(|| AppError::validation("MISSING_TYPE", "type is required"))?;
    let kind = FileKind::parse(&kind_raw)
        .ok_or_else(|| AppError::validation("INVALID_TYPE", "type must be \"file\" or \"folder\""))?;

    let owner_type_raw = body
        .owner_type
        .ok_or_else(|| AppError::validation("MISSING_OWNER_TYPE", "ownerType is required"))?;
    let owner_type = OwnerType::parse(&owner_type_raw).ok_or_else(|| {
        AppError::validation("INVALID_OWNER_TYPE", "ownerType must be \"team\" or \"private\"")
    })?;

    let file_type = match body.file_type.as_deref().filter(|v| !v.is_empty()) {
        Some(raw) => Some(DocFormat::parse(raw).ok_or_else(|| {
            AppError::validation("INVALID_FILE_TYPE", "fileType must be one of: txt, md, docx, doc")
        })?),
        None => None,
    };

    if kind == FileKind::File && file_type.is_none() {
        return Err(AppError::validation(
            "MISSING_FILE_TYPE",
            "fileType is required for file entries",
        ));
    }

    let status = match body.status.as_deref() {
        Some(raw) => FileStatus::parse(raw).ok_or_else(|| {
            AppError::validation("INVALID_STATUS", "status must be one of: modified, new, synced")
        })?,
        None => FileStatus::New,
    };

    let parent_id = body.parent_id.filter(|v| !v.is_empty());
    let parent = resolve_parent(&state.db, parent_id.as_deref()).await?;
    can_mutate(owner_type, parent)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let file = sqlx::query_as::<_, FileNode>(
        r#"
        INSERT INTO files (id, project_id, parent_id, name, type, file_type, content,
                           owner_type, owner_id, status, modified_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&project_id)
    .bind(&parent_id)
    .bind(name)
    .bind(kind)
    .bind(file_type)
    .bind(&body.content)
    .bind(owner_type)
    .bind(&body.owner_id)
    .bind(status)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(file)))
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    Json(body): Json<UpdateFileRequest>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;

    let current = state
        .db
        .file_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("FILE_NOT_FOUND", "File not found"))?;

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

    let explicit_status = match body.status.as_deref() {
        Some(raw) => Some(FileStatus::parse(raw).ok_or_else(|| {
            AppError::validation("INVALID_STATUS", "status must be one of: modified, new, synced")
        })?),
        None => None,
    };

    let file_type = match &body.file_type {
        Some(Some(raw)) if !raw.is_empty() => Some(Some(DocFormat::parse(raw).ok_or_else(
            || {
                AppError::validation(
                    "INVALID_FILE_TYPE",
                    "fileType must be one of: txt, md, docx, doc",
                )
            },
        )?)),
        Some(_) => Some(None),
        None => None,
    };

    // `""` and the literal string "null" are sentinels for clear-to-root,
    // same as an explicit JSON null.
    let parent_id = body
        .parent_id
        .map(|p| p.filter(|v| !v.is_empty() && v != "null"));

    // One shared policy call covers both the team-read-only rule on the
    // target and the parent rules when the node is being moved.
    let parent = match &parent_id {
        Some(Some(parent_id)) => resolve_parent(&state.db, Some(parent_id)).await?,
        _ => ParentLookup::Root,
    };
    can_mutate(current.owner_type, parent)?;

    // A change the client does not label is recorded as modified.
    let touches_content = name.is_some()
        || body.content.is_some()
        || parent_id.is_some()
        || file_type.is_some();
    let status = match explicit_status {
        Some(status) => Some(status),
        None if touches_content => Some(FileStatus::Modified),
        None => None,
    };

    let now = Utc::now();
    let mut qb = QueryBuilder::new("UPDATE files SET modified_at = ");
    qb.push_bind(now);
    if let Some(name) = name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(content) = body.content {
        qb.push(", content = ").push_bind(content);
    }
    if let Some(status) = status {
        qb.push(", status = ").push_bind(status);
    }
    if let Some(parent_id) = parent_id {
        qb.push(", parent_id = ").push_bind(parent_id);
    }
    if let Some(file_type) = file_type {
        qb.push(", file_type = ").push_bind(file_type);
    }
    qb.push(" WHERE id = ").push_bind(&id);
    qb.push(" RETURNING *");

    let file: FileNode = qb.build_query_as().fetch_one(&state.db.pool).await?;
    Ok(Json(file))
}

async fn remove(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let id = require_id(query.id)?;

    let current = state
        .db
        .file_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("FILE_NOT_FOUND", "File not found"))?;

    can_mutate(current.owner_type, ParentLookup::Root)?;

    let deleted = sqlx::query_as::<_, FileNode>("DELETE FROM files WHERE id = ? RETURNING *")
        .bind(&id)
        .fetch_one(&state.db.pool)
        .await?;

    Ok(Json(json!({
        "message": "File deleted successfully",
        "file": deleted,
    })))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut project_id: Option<String> = None;
    let mut owner_type: Option<String> = None;
    let mut parent_id: Option<String> = None;
    let mut owner_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("INVALID_FILE", format!("Failed to read form data: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    AppError::validation("INVALID_FILE", format!("Failed to read file: {e}"))
                })?;
                if let Some(name) = name {
                    file = Some((name, data.to_vec()));
                }
            }
            Some("projectId") => project_id = field.text().await.ok(),
            Some("ownerType") => owner_type = field.text().await.ok(),
            Some("parentId") => parent_id = field.text().await.ok(),
            Some("ownerId") => owner_id = field.text().await.ok(),
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| AppError::validation("INVALID_FILE", "Valid file is required"))?;

    let project_id = project_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PROJECT_ID", "projectId is required"))?;

    let owner_type = owner_type
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_OWNER_TYPE", "ownerType is required"))?;
    // Uploads only ever land in private space; team trees are seeded
    // out-of-band.
    if owner_type != "private" {
        return Err(AppError::forbidden(
            "TEAM_FILES_READ_ONLY",
            "Team files are read-only and cannot accept uploads",
        ));
    }

    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::payload_too_large(
            "FILE_TOO_LARGE",
            "File exceeds the 5MB limit",
        ));
    }

    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    let format = extension
        .as_deref()
        .and_then(DocFormat::parse)
        .ok_or_else(|| {
            AppError::validation("INVALID_FILE_TYPE", "Only txt, md, docx, doc files are supported")
        })?;

    let parent_id = parent_id.filter(|v| !v.is_empty() && v != "null");
    let owner_id = owner_id.filter(|v| !v.is_empty() && v != "null");

    let parent = resolve_parent(&state.db, parent_id.as_deref()).await?;
    can_mutate(OwnerType::Private, parent)?;

    let content = if format.is_text() {
        String::from_utf8_lossy(&data).into_owned()
    } else {
        base64::engine::general_purpose::STANDARD.encode(&data)
    };

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let inserted = sqlx::query_as::<_, FileNode>(
        r#"
        INSERT INTO files (id, project_id, parent_id, name, type, file_type, content,
                           owner_type, owner_id, status, modified_at, created_at)
        VALUES (?, ?, ?, ?, 'file', ?, ?, 'private', ?, 'new', ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&project_id)
    .bind(&parent_id)
    .bind(&file_name)
    .bind(format)
    .bind(&content)
    .bind(&owner_id)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}
