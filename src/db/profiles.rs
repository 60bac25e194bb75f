use super::models::{ProfileRow, PublicProfile};
use super::{Db, in_placeholders, sql};
use crate::types::UserId;

#[tracing::instrument(skip(pool), err)]
pub async fn get_profile(pool: &Db, id: &UserId) -> Result<Option<ProfileRow>, sqlx::Error> {
    let q = sql("SELECT * FROM profiles WHERE id = ?");
    sqlx::query_as::<_, ProfileRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_profile_by_email(
    pool: &Db,
    email: &str,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    let q = sql("SELECT * FROM profiles WHERE email = ?");
    sqlx::query_as::<_, ProfileRow>(&q)
        .bind(email)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool, password_hash), err)]
pub async fn create_profile(
    pool: &Db,
    id: &UserId,
    email: &str,
    password_hash: &str,
    name: &str,
    last_name: &str,
) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO profiles (id, email, password_hash, name, last_name) VALUES (?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(last_name)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn update_profile(
    pool: &Db,
    id: &UserId,
    name: &str,
    last_name: &str,
    bio: &str,
    image_url: Option<&str>,
    is_account_protected: bool,
) -> Result<bool, sqlx::Error> {
    let q = sql(
        "UPDATE profiles SET name = ?, last_name = ?, bio = ?, image_url = ?, \
         is_account_protected = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    );
    let result = sqlx::query(&q)
        .bind(name)
        .bind(last_name)
        .bind(bio)
        .bind(image_url)
        .bind(is_account_protected)
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// 指定idの公開プロフィールを1クエリでまとめて取得する。
/// `WHERE id IN (...)`方式で、行ごとの往復は発生しない。
#[tracing::instrument(skip(pool, ids), err)]
pub async fn get_public_profiles(
    pool: &Db,
    ids: &[String],
) -> Result<Vec<PublicProfile>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = format!(
        "SELECT id, name, last_name, image_url FROM profiles WHERE id IN ({})",
        in_placeholders(ids.len())
    );
    let q = sql(&stmt);
    let mut query = sqlx::query_as::<_, PublicProfile>(&q);
    for id in ids {
        query = query.bind(id);
    }
    query.fetch_all(pool).await
}

#[tracing::instrument(skip(pool), err)]
pub async fn has_role(pool: &Db, user_id: &UserId, role: &str) -> Result<bool, sqlx::Error> {
    let q = sql("SELECT 1 FROM user_roles WHERE user_id = ? AND role = ?");
    let row: Option<(i32,)> = sqlx::query_as(&q)
        .bind(user_id.as_str())
        .bind(role)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    #[tokio::test]
    async fn batched_profile_lookup_merges_by_id() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;
        insert_profile(&pool, "u2", "u2@example.com").await;

        let profiles = get_public_profiles(
            &pool,
            &["u1".to_string(), "u2".to_string(), "ghost".to_string()],
        )
        .await
        .unwrap();

        // 存在しないidは単に落ちる（呼び出し側がスタブを補う）
        assert_eq!(profiles.len(), 2);
        assert!(profiles.iter().any(|p| p.id == "u1"));
        assert!(profiles.iter().any(|p| p.id == "u2"));
    }

    #[tokio::test]
    async fn empty_id_set_skips_query() {
        let pool = test_pool().await;
        assert!(get_public_profiles(&pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn role_check() {
        let pool = test_pool().await;
        insert_profile(&pool, "mod", "mod@example.com").await;
        sqlx::query("INSERT INTO user_roles (id, user_id, role) VALUES ('r1', 'mod', 'moderator')")
            .execute(&pool)
            .await
            .unwrap();

        let id = UserId("mod".into());
        assert!(has_role(&pool, &id, "moderator").await.unwrap());
        assert!(!has_role(&pool, &id, "admin").await.unwrap());
    }
}
