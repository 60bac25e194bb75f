use super::models::RelationshipRow;
use super::{Db, sql};
use crate::types::{RelationshipId, UserId};

#[tracing::instrument(skip(pool), err)]
pub async fn create_relationship(
    pool: &Db,
    id: &RelationshipId,
    user_id: &UserId,
    with_user: &str,
    relation: &str,
) -> Result<(), sqlx::Error> {
    let q = sql("INSERT INTO relationships (id, user_id, with_user, relation) VALUES (?, ?, ?, ?)");
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(user_id.as_str())
        .bind(with_user)
        .bind(relation)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_relationships(
    pool: &Db,
    user_id: &UserId,
) -> Result<Vec<RelationshipRow>, sqlx::Error> {
    let q = sql("SELECT * FROM relationships WHERE user_id = ? ORDER BY created_at ASC");
    sqlx::query_as::<_, RelationshipRow>(&q)
        .bind(user_id.as_str())
        .fetch_all(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn delete_relationship(
    pool: &Db,
    id: &RelationshipId,
    user_id: &UserId,
) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM relationships WHERE id = ? AND user_id = ?");
    let result = sqlx::query(&q)
        .bind(id.as_str())
        .bind(user_id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    #[tokio::test]
    async fn edges_are_directed_and_owner_scoped() {
        let pool = test_pool().await;
        insert_profile(&pool, "a", "a@example.com").await;
        insert_profile(&pool, "b", "b@example.com").await;

        let a = UserId("a".into());
        let b = UserId("b".into());
        let edge = RelationshipId::new_v4();
        create_relationship(&pool, &edge, &a, "b", "sister").await.unwrap();

        // 逆向きの行は自動では作られない
        assert_eq!(get_relationships(&pool, &a).await.unwrap().len(), 1);
        assert!(get_relationships(&pool, &b).await.unwrap().is_empty());

        // 他人のエッジは消せない
        assert!(!delete_relationship(&pool, &edge, &b).await.unwrap());
        assert!(delete_relationship(&pool, &edge, &a).await.unwrap());
    }

    #[tokio::test]
    async fn dangling_target_is_allowed() {
        let pool = test_pool().await;
        insert_profile(&pool, "a", "a@example.com").await;

        // with_user は外部キーではないので、存在しないidも保持できる
        let a = UserId("a".into());
        create_relationship(&pool, &RelationshipId::new_v4(), &a, "ghost", "friend")
            .await
            .unwrap();
        let edges = get_relationships(&pool, &a).await.unwrap();
        assert_eq!(edges[0].with_user, "ghost");
    }
}
