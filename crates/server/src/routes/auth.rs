use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{
        clear_session_cookie, create_session, find_valid_session_by_token, hash_password,
        revoke_session_by_token, session_cookie, session_token_from_jar,
        update_user_login_metadata, verify_password, SessionUser,
    },
    error::{AppError, Result},
    regions,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar_url: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_NAME", "name is required"))?;

    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_EMAIL", "email is required"))?;
    let email = email.to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("INVALID_EMAIL", "email format is invalid"));
    }

    let password = body.password.as_deref().unwrap_or_default();
    if password.len() < 8 {
        return Err(AppError::validation(
            "INVALID_PASSWORD",
            "password must be at least 8 characters",
        ));
    }

    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("EMAIL_IN_USE", "email already registered"));
    }

    let region = body
        .region
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(regions::DEFAULT_REGION);
    if !regions::is_valid(region) {
        return Err(AppError::validation("INVALID_REGION", "region is invalid"));
    }

    let password_hash = hash_password(password);
    let user_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, avatar_url, role, region,
                           created_at, updated_at, last_login_at)
        VALUES (?, ?, ?, ?, ?, 'user', ?, ?, ?, ?)
        "#,
    )
    .bind(&user_id)
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .bind(&body.avatar_url)
    .bind(region)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&state.db.pool)
    .await?;

    let session = create_session(&state.db.pool, &user_id).await?;
    let jar = jar.add(session_cookie(
        &session.token,
        session.expires_at,
        state.config.is_production(),
    ));

    let user = SessionUser {
        id: user_id,
        name: name.to_string(),
        email,
        avatar_url: body.avatar_url,
        role: crate::db::models::UserRole::User,
        region: region.to_string(),
    };

    Ok((StatusCode::CREATED, jar, Json(json!({ "user": user }))))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_EMAIL", "email is required"))?;
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("MISSING_PASSWORD", "password is required"))?;

    let email = email.to_lowercase();

    let found = sqlx::query_as::<_, SessionUserWithHash>(
        "SELECT id, name, email, avatar_url, role, region, password_hash FROM users WHERE email = ?",
    )
    .bind(&email)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("INVALID_CREDENTIALS", "invalid credentials"))?;

    if !verify_password(password, &found.password_hash) {
        return Err(AppError::unauthorized("INVALID_CREDENTIALS", "invalid credentials"));
    }

    // Replace a session presented by this client instead of accumulating one
    // per login. Sessions issued elsewhere are untouched.
    if let Some(existing) = session_token_from_jar(&jar) {
        revoke_session_by_token(&state.db.pool, &existing).await?;
    }

    let session = create_session(&state.db.pool, &found.user.id).await?;
    update_user_login_metadata(&state.db.pool, &found.user.id).await?;

    let jar = jar.add(session_cookie(
        &session.token,
        session.expires_at,
        state.config.is_production(),
    ));

    Ok((jar, Json(json!({ "user": found.user }))))
}

#[derive(Debug, sqlx::FromRow)]
struct SessionUserWithHash {
    #[sqlx(flatten)]
    user: SessionUser,
    password_hash: String,
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    if let Some(token) = session_token_from_jar(&jar) {
        revoke_session_by_token(&state.db.pool, &token).await?;
    }

    let jar = jar.add(clear_session_cookie(state.config.is_production()));
    Ok((jar, Json(json!({ "success": true }))))
}

/// Returns `{user: null}` rather than 401 for anonymous callers; the client
/// uses this to decide whether to show the login screen.
async fn session(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let user = match session_token_from_jar(&jar) {
        Some(token) => find_valid_session_by_token(&state.db.pool, &token).await?,
        None => None,
    };

    Ok(Json(json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@.com"));
        assert!(!is_valid_email("al ice@example.com"));
    }
}
