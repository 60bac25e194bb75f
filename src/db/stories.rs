use super::models::StoryRow;
use super::{Db, sql};
use crate::types::{ChapterId, StoryId, UserId, new_invite_code};

/// 作成時にシードされるデフォルト章のタイトル
const DEFAULT_CHAPTER_TITLE: &str = "Chapter 1";

/// Create a story together with everything a client expects to already
/// exist: both invite codes, the creator's membership and ownership
/// rows, and the seed chapter. One transaction.
#[tracing::instrument(skip(pool), err)]
pub async fn create_story(
    pool: &Db,
    id: &StoryId,
    title: &str,
    image_url: Option<&str>,
    creator: &UserId,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let q = sql(
        "INSERT INTO stories (id, title, image_url, invite_code, invite_code_for_owner, user_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(title)
        .bind(image_url)
        .bind(new_invite_code())
        .bind(new_invite_code())
        .bind(creator.as_str())
        .execute(&mut *tx)
        .await?;

    let q = sql("INSERT INTO story_users (id, story_id, user_id, role) VALUES (?, ?, ?, 'owner')");
    sqlx::query(&q)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(id.as_str())
        .bind(creator.as_str())
        .execute(&mut *tx)
        .await?;

    let q = sql("INSERT INTO story_owners (id, story_id, user_id) VALUES (?, ?, ?)");
    sqlx::query(&q)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(id.as_str())
        .bind(creator.as_str())
        .execute(&mut *tx)
        .await?;

    // シード章（is_default、order=1）
    let q = sql(
        "INSERT INTO chapters (id, title, \"order\", story_id, is_default, user_id) \
         VALUES (?, ?, 1, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(ChapterId::new_v4().as_str())
        .bind(DEFAULT_CHAPTER_TITLE)
        .bind(id.as_str())
        .bind(true)
        .bind(creator.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_story(pool: &Db, id: &StoryId) -> Result<Option<StoryRow>, sqlx::Error> {
    let q = sql("SELECT * FROM stories WHERE id = ?");
    sqlx::query_as::<_, StoryRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

/// 招待コードからストーリーを引く。メンバー用・オーナー用の両列を見る。
#[tracing::instrument(skip(pool, code), err)]
pub async fn get_story_by_invite_code(
    pool: &Db,
    code: &str,
) -> Result<Option<StoryRow>, sqlx::Error> {
    let q = sql("SELECT * FROM stories WHERE invite_code = ? OR invite_code_for_owner = ?");
    sqlx::query_as::<_, StoryRow>(&q)
        .bind(code)
        .bind(code)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_stories_for_user(
    pool: &Db,
    user_id: &UserId,
) -> Result<Vec<StoryRow>, sqlx::Error> {
    let q = sql(
        "SELECT s.* FROM stories s \
         JOIN story_users su ON su.story_id = s.id \
         WHERE su.user_id = ? ORDER BY s.created_at DESC",
    );
    sqlx::query_as::<_, StoryRow>(&q)
        .bind(user_id.as_str())
        .fetch_all(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn update_story(
    pool: &Db,
    id: &StoryId,
    title: &str,
    image_url: Option<&str>,
    locked: bool,
) -> Result<bool, sqlx::Error> {
    let q = sql(
        "UPDATE stories SET title = ?, image_url = ?, locked = ?, \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    );
    let result = sqlx::query(&q)
        .bind(title)
        .bind(image_url)
        .bind(locked)
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// コードのローテーション。既存メンバーには影響しない（失効処理なし）。
#[tracing::instrument(skip(pool), err)]
pub async fn rotate_invite_codes(
    pool: &Db,
    id: &StoryId,
    rotate_member: bool,
    rotate_owner: bool,
) -> Result<bool, sqlx::Error> {
    if !rotate_member && !rotate_owner {
        return Ok(false);
    }
    let q = sql(
        "UPDATE stories SET \
         invite_code = CASE WHEN ? THEN ? ELSE invite_code END, \
         invite_code_for_owner = CASE WHEN ? THEN ? ELSE invite_code_for_owner END, \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    );
    let result = sqlx::query(&q)
        .bind(rotate_member)
        .bind(new_invite_code())
        .bind(rotate_owner)
        .bind(new_invite_code())
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool), err)]
pub async fn delete_story(pool: &Db, id: &StoryId) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM stories WHERE id = ?");
    let result = sqlx::query(&q).bind(id.as_str()).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    async fn seed_story(pool: &Db) -> StoryId {
        insert_profile(pool, "creator", "creator@example.com").await;
        let id = StoryId::new_v4();
        create_story(pool, &id, "Test", None, &UserId("creator".into()))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn create_seeds_membership_ownership_and_default_chapter() {
        let pool = test_pool().await;
        let id = seed_story(&pool).await;

        let story = get_story(&pool, &id).await.unwrap().unwrap();
        assert!(!story.locked);
        assert!(!story.invite_code.is_empty());
        assert!(story.invite_code_for_owner.is_some());

        let chapters = crate::db::chapters::get_chapters_by_story(&pool, &id)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert!(chapters[0].is_default);
        assert_eq!(chapters[0].order, 1);

        let creator = UserId("creator".into());
        assert!(crate::db::members::is_member(&pool, &id, &creator)
            .await
            .unwrap());
        assert!(crate::db::members::is_owner(&pool, &id, &creator)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn lookup_by_either_invite_code() {
        let pool = test_pool().await;
        let id = seed_story(&pool).await;
        let story = get_story(&pool, &id).await.unwrap().unwrap();

        let by_member = get_story_by_invite_code(&pool, &story.invite_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_member.id, story.id);

        let owner_code = story.invite_code_for_owner.unwrap();
        let by_owner = get_story_by_invite_code(&pool, &owner_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_owner.id, story.id);

        assert!(get_story_by_invite_code(&pool, "NOSUCHCODE")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn missing_story_yields_none() {
        let pool = test_pool().await;
        let ghost = StoryId("does-not-exist".into());
        assert!(get_story(&pool, &ghost).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotation_changes_only_requested_code() {
        let pool = test_pool().await;
        let id = seed_story(&pool).await;
        let before = get_story(&pool, &id).await.unwrap().unwrap();

        assert!(rotate_invite_codes(&pool, &id, true, false).await.unwrap());
        let after = get_story(&pool, &id).await.unwrap().unwrap();
        assert_ne!(after.invite_code, before.invite_code);
        assert_eq!(after.invite_code_for_owner, before.invite_code_for_owner);
    }

    #[tokio::test]
    async fn delete_cascades_to_chapters() {
        let pool = test_pool().await;
        let id = seed_story(&pool).await;
        assert!(delete_story(&pool, &id).await.unwrap());

        let chapters = crate::db::chapters::get_chapters_by_story(&pool, &id)
            .await
            .unwrap();
        assert!(chapters.is_empty());
    }
}
