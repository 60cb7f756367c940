//! Credential and session engine: password derivation, opaque bearer tokens
//! stored server-side, and the session cookie they travel in.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::Sha512;
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::models::UserRole;
use crate::error::Result;

const PASSWORD_ITERATIONS: u32 = 120_000;
const PASSWORD_KEY_LEN: usize = 64;
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 24;
const SESSION_TTL_DAYS: i64 = 7;

pub const SESSION_COOKIE: &str = "draftdesk_session";

/// The identity a valid session token resolves to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub region: String,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Derives a storable secret as `saltHex:derivedHex`. The colon-separated
/// two-part format distinguishes a stored hash from a raw password.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);

    let mut derived = [0u8; PASSWORD_KEY_LEN];
    pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        salt_hex.as_bytes(),
        PASSWORD_ITERATIONS,
        &mut derived,
    );

    format!("{salt_hex}:{}", hex::encode(derived))
}

/// A malformed stored value is treated as a wrong password, never an error.
/// The comparison is constant-time over fixed-length byte slices.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, hash_hex)) = stored.split_once(':') else {
        return false;
    };
    if salt.is_empty() || hash_hex.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut derived = [0u8; PASSWORD_KEY_LEN];
    pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        salt.as_bytes(),
        PASSWORD_ITERATIONS,
        &mut derived,
    );

    if expected.len() != derived.len() {
        return false;
    }
    derived.as_slice().ct_eq(expected.as_slice()).into()
}

pub async fn create_session(pool: &SqlitePool, user_id: &str) -> Result<NewSession> {
    let mut raw = [0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

    sqlx::query("INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(NewSession { token, expires_at })
}

/// Resolves a token to its user. An unknown or expired token is revoked on
/// the spot (lazy garbage collection) and resolves to `None`.
pub async fn find_valid_session_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<SessionUser>> {
    let user = sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT u.id, u.name, u.email, u.avatar_url, u.role, u.region
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ? AND s.expires_at > ?
        "#,
    )
    .bind(token)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    if user.is_none() {
        revoke_session_by_token(pool, token).await?;
    }

    Ok(user)
}

/// Idempotent: revoking a token that does not exist is a no-op.
pub async fn revoke_session_by_token(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_user_login_metadata(pool: &SqlitePool, user_id: &str) -> Result<()> {
    let now = Utc::now();
    sqlx::query("UPDATE users SET updated_at = ?, last_login_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub fn session_token_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn session_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, String::new()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn test_pool() -> SqlitePool {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db.pool
    }

    async fn insert_user(pool: &SqlitePool, id: &str, email: &str) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, region, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'user', '北京', ?, ?)",
        )
        .bind(id)
        .bind("Test User")
        .bind(email)
        .bind(hash_password("password123"))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("correct horse battery stapler", &stored));
    }

    #[test]
    fn hashing_twice_uses_fresh_salts() {
        let a = hash_password("same-password");
        let b = hash_password("same-password");
        assert_ne!(a, b);
        assert!(verify_password("same-password", &a));
        assert!(verify_password("same-password", &b));
    }

    #[test]
    fn stored_hash_has_two_part_format() {
        let stored = hash_password("pw");
        let (salt, hash) = stored.split_once(':').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(hash.len(), PASSWORD_KEY_LEN * 2);
    }

    #[test]
    fn malformed_stored_value_is_wrong_password() {
        assert!(!verify_password("pw", "no-separator"));
        assert!(!verify_password("pw", ":"));
        assert!(!verify_password("pw", "abcd:not-hex"));
        assert!(!verify_password("pw", "abcd:beef"));
        assert!(!verify_password("pw", ""));
    }

    #[tokio::test]
    async fn session_roundtrip_resolves_to_user() {
        let pool = test_pool().await;
        insert_user(&pool, "u1", "u1@example.com").await;

        let session = create_session(&pool, "u1").await.unwrap();
        assert_eq!(session.token.len(), TOKEN_LEN * 2);

        let user = find_valid_session_by_token(&pool, &session.token)
            .await
            .unwrap()
            .expect("fresh session should resolve");
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "u1@example.com");
    }

    #[tokio::test]
    async fn expired_session_is_revoked_on_lookup() {
        let pool = test_pool().await;
        insert_user(&pool, "u1", "u1@example.com").await;

        sqlx::query("INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?, ?, ?, ?)")
            .bind("s1")
            .bind("u1")
            .bind("stale-token")
            .bind(Utc::now() - Duration::days(1))
            .execute(&pool)
            .await
            .unwrap();

        let user = find_valid_session_by_token(&pool, "stale-token").await.unwrap();
        assert!(user.is_none());

        // The lookup garbage-collected the row.
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE token = ?")
            .bind("stale-token")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        // A second lookup is still a clean miss, not an error.
        let user = find_valid_session_by_token(&pool, "stale-token").await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn revoked_session_no_longer_resolves() {
        let pool = test_pool().await;
        insert_user(&pool, "u1", "u1@example.com").await;

        let session = create_session(&pool, "u1").await.unwrap();
        revoke_session_by_token(&pool, &session.token).await.unwrap();

        let user = find_valid_session_by_token(&pool, &session.token).await.unwrap();
        assert!(user.is_none());

        // Revoking again is a no-op.
        revoke_session_by_token(&pool, &session.token).await.unwrap();
    }
}
