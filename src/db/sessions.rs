use super::models::SessionRow;
use super::{Db, sql};
use crate::types::UserId;

/// SQLiteでは期限切れ比較をSQL側で行うため、CURRENT_TIMESTAMPと同じ
/// `YYYY-MM-DD HH:MM:SS` 形式のTEXTで格納する。
#[cfg(not(feature = "postgres"))]
pub(crate) fn format_expiry(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[tracing::instrument(skip(pool, token_hash), err)]
pub async fn create_session(
    pool: &Db,
    token_hash: &str,
    user_id: &UserId,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), sqlx::Error> {
    #[cfg(not(feature = "postgres"))]
    let expires_at = format_expiry(expires_at);

    let q = sql("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)");
    sqlx::query(&q)
        .bind(token_hash)
        .bind(user_id.as_str())
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Look up a live session. Expired rows are invisible here and are
/// swept separately by the cleanup task.
#[tracing::instrument(skip(pool, token_hash), err)]
pub async fn get_live_session(
    pool: &Db,
    token_hash: &str,
) -> Result<Option<SessionRow>, sqlx::Error> {
    let q = sql("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > CURRENT_TIMESTAMP");
    sqlx::query_as::<_, SessionRow>(&q)
        .bind(token_hash)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool, token_hash), err)]
pub async fn delete_session(pool: &Db, token_hash: &str) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM sessions WHERE token_hash = ?");
    let result = sqlx::query(&q).bind(token_hash).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool), err)]
pub async fn delete_expired_sessions(pool: &Db) -> Result<u64, sqlx::Error> {
    let q = sql("DELETE FROM sessions WHERE expires_at <= CURRENT_TIMESTAMP");
    let result = sqlx::query(&q).execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    #[tokio::test]
    async fn live_session_roundtrip() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;

        let user = UserId("u1".into());
        let expiry = chrono::Utc::now() + chrono::Duration::days(30);
        create_session(&pool, "hash-a", &user, expiry).await.unwrap();

        let session = get_live_session(&pool, "hash-a").await.unwrap().unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(get_live_session(&pool, "hash-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_is_invisible_and_swept() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;

        let user = UserId("u1".into());
        let past = chrono::Utc::now() - chrono::Duration::hours(1);
        create_session(&pool, "stale", &user, past).await.unwrap();

        assert!(get_live_session(&pool, "stale").await.unwrap().is_none());
        assert_eq!(delete_expired_sessions(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn logout_deletes_only_presented_session() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;

        let user = UserId("u1".into());
        let expiry = chrono::Utc::now() + chrono::Duration::days(1);
        create_session(&pool, "one", &user, expiry).await.unwrap();
        create_session(&pool, "two", &user, expiry).await.unwrap();

        assert!(delete_session(&pool, "one").await.unwrap());
        assert!(get_live_session(&pool, "one").await.unwrap().is_none());
        assert!(get_live_session(&pool, "two").await.unwrap().is_some());
    }
}
