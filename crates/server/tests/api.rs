use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use draftdesk_server::{config::Config, db::Database, router, AppState};

async fn test_app_with(app_url: Option<&str>) -> (Router, Database) {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory db");
    db.run_migrations().await.expect("run migrations");

    let state = AppState {
        db: db.clone(),
        config: Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            app_url: app_url.map(str::to_string),
            environment: "development".to_string(),
        },
    };
    (router(state), db)
}

async fn test_app() -> (Router, Database) {
    test_app_with(None).await
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.expect("read body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn session_cookie_from(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie");
    assert!(set_cookie.starts_with("draftdesk_session="));
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

async fn register_user(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({"name": "Ada", "email": email, "password": "correct horse"}),
        ))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie_from(&response)
}

async fn create_project(app: &Router, name: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/projects", json!({"name": name})))
        .await
        .expect("create project");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["id"].as_str().expect("project id").to_string()
}

async fn seed_team_folder(db: &Database, project_id: &str, id: &str) {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO files (id, project_id, parent_id, name, type, file_type, content,
                           owner_type, owner_id, status, modified_at, created_at)
        VALUES (?, ?, NULL, 'shared', 'folder', NULL, NULL, 'team', NULL, 'synced', ?, ?)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(now)
    .bind(now)
    .execute(&db.pool)
    .await
    .expect("seed team folder");
}

#[tokio::test]
async fn register_then_session_round_trip() {
    let (app, _db) = test_app().await;
    let cookie = register_user(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn session_without_cookie_is_null_not_unauthorized() {
    let (app, _db) = test_app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/auth/session").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn login_with_wrong_password_sets_no_cookie() {
    let (app, _db) = test_app().await;
    register_user(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({"email": "ada@example.com", "password": "wrong horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let (app, _db) = test_app().await;
    let cookie = register_user(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (app, _db) = test_app().await;
    register_user(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({"name": "Eve", "email": "ADA@example.com", "password": "long enough"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["code"], "EMAIL_IN_USE");
}

#[tokio::test]
async fn project_defaults_to_unsaved() {
    let (app, _db) = test_app().await;
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/projects", json!({"name": "Novel"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["status"], "unsaved");
    assert_eq!(body["name"], "Novel");
}

#[tokio::test]
async fn creating_team_files_is_forbidden() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "draft",
                "type": "folder",
                "ownerType": "team",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "TEAM_FILES_READ_ONLY");
}

#[tokio::test]
async fn private_file_cannot_nest_under_team_folder() {
    let (app, db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;
    seed_team_folder(&db, &project_id, "team-root").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "mine.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
                "parentId": "team-root",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "TEAM_FILES_READ_ONLY");
}

#[tokio::test]
async fn missing_parent_is_not_found() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "orphan.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
                "parentId": "no-such-folder",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["code"], "PARENT_NOT_FOUND");
}

#[tokio::test]
async fn a_file_cannot_be_a_parent() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "note.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let file_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "child.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
                "parentId": file_id,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_PARENT_TYPE");
}

#[tokio::test]
async fn renaming_a_team_file_fails_but_a_private_copy_succeeds() {
    let (app, db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;
    seed_team_folder(&db, &project_id, "team-root").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/files?id=team-root",
            json!({"name": "renamed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "TEAM_FILES_READ_ONLY");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "copy.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
                "status": "synced",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["status"], "synced");
    let file_id = created["id"].as_str().unwrap();

    // A rename without an explicit status marks the copy as modified.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/files?id={file_id}"),
            json!({"name": "copy-renamed.md"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["name"], "copy-renamed.md");
    assert_eq!(updated["status"], "modified");
}

#[tokio::test]
async fn string_null_parent_moves_a_file_to_root() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "drafts",
                "type": "folder",
                "ownerType": "private",
            }),
        ))
        .await
        .unwrap();
    let folder_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "note.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
                "parentId": folder_id,
            }),
        ))
        .await
        .unwrap();
    let file_id = response_json(response).await["id"].as_str().unwrap().to_string();

    // The literal string "null" clears the parent rather than naming one.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/files?id={file_id}"),
            json!({"parentId": "null"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved = response_json(response).await;
    assert!(moved["parentId"].is_null());
    assert_eq!(moved["status"], "modified");
}

#[tokio::test]
async fn update_with_explicit_status_is_honored() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/files",
            json!({
                "projectId": project_id,
                "name": "note.md",
                "type": "file",
                "fileType": "md",
                "ownerType": "private",
            }),
        ))
        .await
        .unwrap();
    let file_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/files?id={file_id}"),
            json!({"content": "synced body", "status": "synced"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["status"], "synced");
    assert_eq!(updated["content"], "synced body");
}

fn multipart_request(uri: &str, file_name: &str, data: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    let boundary = "draftdesk-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_accepts_markdown_and_stores_text() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/api/files/upload",
            "chapter one.md",
            "# Chapter One".as_bytes(),
            &[("projectId", &project_id), ("ownerType", "private")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["name"], "chapter one.md");
    assert_eq!(body["fileType"], "md");
    assert_eq!(body["status"], "new");
    assert_eq!(body["content"], "# Chapter One");
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/api/files/upload",
            "setup.exe",
            b"MZ",
            &[("projectId", &project_id), ("ownerType", "private")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_FILE_TYPE");
}

#[tokio::test]
async fn upload_rejects_oversize_file() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let data = vec![b'a'; 6 * 1024 * 1024];
    let response = app
        .clone()
        .oneshot(multipart_request(
            "/api/files/upload",
            "big.md",
            &data,
            &[("projectId", &project_id), ("ownerType", "private")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = response_json(response).await;
    assert_eq!(body["code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn upload_refuses_team_space() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/api/files/upload",
            "notes.md",
            b"shared",
            &[("projectId", &project_id), ("ownerType", "team")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "TEAM_FILES_READ_ONLY");
}

#[tokio::test]
async fn message_update_requires_some_field() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/messages",
            json!({"projectId": project_id, "role": "user", "content": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let message_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/messages?id={message_id}"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "NO_UPDATES");
}

#[tokio::test]
async fn messages_list_newest_first() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    for content in ["first", "second"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/messages",
                json!({"projectId": project_id, "role": "user", "content": content}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        // created_at has sub-second precision; a short pause keeps ordering
        // deterministic.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/messages?projectId={project_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["second", "first"]);
}

#[tokio::test]
async fn message_delete_returns_the_row() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/messages",
            json!({"projectId": project_id, "role": "assistant", "content": "bye"}),
        ))
        .await
        .unwrap();
    let message_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/messages?id={message_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Message deleted successfully");
    assert_eq!(body["deleted"]["content"], "bye");
}

#[tokio::test]
async fn comment_update_requires_some_field() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/comments",
            json!({"fileId": "file-1", "author": "ada", "content": "looks wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/comments?id={comment_id}"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "NO_UPDATE_FIELDS");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/comments?id={comment_id}"),
            json!({"resolved": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["resolved"], true);
}

#[tokio::test]
async fn versions_keep_full_snapshots() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/versions",
            json!({"fileId": "file-1", "title": "v1", "author": "ada", "content": "draft one"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/versions", json!({"fileId": "file-1", "title": "v2"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "MISSING_AUTHOR");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/versions?fileId=file-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["content"], "draft one");
}

#[tokio::test]
async fn task_status_round_trip() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tasks",
            json!({"fileId": "file-1", "title": "review chapter"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["status"], "pending");
    let task_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/tasks?id={task_id}"),
            json!({"status": "in_progress"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "in_progress");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/tasks?id={task_id}"),
            json!({"status": "paused"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_STATUS");
}

#[tokio::test]
async fn duplicate_project_members_are_permitted() {
    let (app, _db) = test_app().await;
    let project_id = create_project(&app, "Novel").await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/project-members",
                json!({"projectId": project_id, "userId": "user-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/project-members?projectId={project_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["role"], "viewer");
}

#[tokio::test]
async fn context_file_lookup_needs_a_parameter() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/message-context-files")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "MISSING_PARAMETER");
}

#[tokio::test]
async fn context_file_delete_uses_deleted_record_key() {
    let (app, _db) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/message-context-files",
            json!({"messageId": "msg-1", "fileId": "file-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let record_id = response_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/message-context-files?id={record_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["deletedRecord"]["messageId"], "msg-1");
}

#[tokio::test]
async fn mutations_from_a_foreign_origin_are_rejected() {
    let (app, _db) = test_app_with(Some("http://localhost:3000")).await;

    let mut request = json_request("POST", "/api/projects", json!({"name": "Novel"}));
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://evil.example".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "INVALID_ORIGIN");

    let mut request = json_request("POST", "/api/projects", json!({"name": "Novel"}));
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn reads_skip_the_origin_check() {
    let (app, _db) = test_app_with(Some("http://localhost:3000")).await;

    let mut request = Request::builder()
        .uri("/api/projects")
        .body(Body::empty())
        .unwrap();
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://evil.example".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _db) = test_app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
