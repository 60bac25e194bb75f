use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::db;
use crate::db::Db;
use crate::error::AppError;
use crate::types::UserId;

/// セッション有効期間
const SESSION_TTL_DAYS: i64 = 30;
const TOKEN_BYTES: usize = 32;

/// Authenticated caller extracted from `Authorization: Bearer <token>`.
///
/// トークンは発行時に一度だけ平文で返し、サーバ側にはSHA-256
/// ダイジェストのみ保存する。照合はダイジェスト同士の等値比較。
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    /// ログアウトで該当セッションを消すために保持
    pub token_hash: String,
}

/// Hash a bearer token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Issue a fresh session for `user_id` and return the plaintext token.
pub async fn issue_session(pool: &Db, user_id: &UserId) -> Result<String, AppError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);

    let expires_at = chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS);
    db::sessions::create_session(pool, &hash_token(&token), user_id, expires_at).await?;
    Ok(token)
}

pub(crate) async fn authenticate(
    pool: &Db,
    auth_header: &str,
) -> Result<AuthenticatedUser, AppError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".into()))?;

    let token_hash = hash_token(token);
    let session = db::sessions::get_live_session(pool, &token_hash)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?;

    Ok(AuthenticatedUser {
        user_id: UserId(session.user_id),
        token_hash,
    })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;

        authenticate(&state.pool, auth_header).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    #[tokio::test]
    async fn issued_token_authenticates() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;

        let user = UserId("u1".into());
        let token = issue_session(&pool, &user).await.unwrap();

        let auth = authenticate(&pool, &format!("Bearer {token}")).await.unwrap();
        assert_eq!(auth.user_id, user);
    }

    #[tokio::test]
    async fn malformed_headers_are_rejected() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;
        let token = issue_session(&pool, &UserId("u1".into())).await.unwrap();

        // Bearerプレフィックスなし
        assert!(authenticate(&pool, &token).await.is_err());
        assert!(authenticate(&pool, "Bearer not-a-real-token").await.is_err());
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;
        let token = issue_session(&pool, &UserId("u1".into())).await.unwrap();

        let auth = authenticate(&pool, &format!("Bearer {token}")).await.unwrap();
        db::sessions::delete_session(&pool, &auth.token_hash)
            .await
            .unwrap();
        assert!(authenticate(&pool, &format!("Bearer {token}")).await.is_err());
    }

    #[test]
    fn token_hash_is_stable_and_opaque() {
        let a = hash_token("secret");
        assert_eq!(a, hash_token("secret"));
        assert_ne!(a, hash_token("other"));
        assert!(!a.contains("secret"));
    }
}
