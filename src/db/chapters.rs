use super::models::ChapterRow;
use super::{Db, sql};
use crate::types::{ChapterId, StoryId, UserId};

/// Create a chapter with the next `"order"` among its story siblings.
///
/// 並び順はINSERT文の中で `COALESCE(MAX("order"), 0) + 1` により
/// 採番する。UNIQUE (story_id, "order") があるため同時作成の負け側は
/// 一意制約違反（=409）になる。重複した順序値は生まれない。
#[tracing::instrument(skip(pool), err)]
pub async fn create_chapter(
    pool: &Db,
    id: &ChapterId,
    story_id: &StoryId,
    title: &str,
    image_url: Option<&str>,
    created_by: &UserId,
) -> Result<ChapterRow, sqlx::Error> {
    let q = sql(
        "INSERT INTO chapters (id, title, \"order\", story_id, image_url, user_id) \
         VALUES (?, ?, (SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM chapters WHERE story_id = ?), ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(title)
        .bind(story_id.as_str())
        .bind(story_id.as_str())
        .bind(image_url)
        .bind(created_by.as_str())
        .execute(pool)
        .await?;

    let q = sql("SELECT * FROM chapters WHERE id = ?");
    sqlx::query_as::<_, ChapterRow>(&q)
        .bind(id.as_str())
        .fetch_one(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_chapter(pool: &Db, id: &ChapterId) -> Result<Option<ChapterRow>, sqlx::Error> {
    let q = sql("SELECT * FROM chapters WHERE id = ?");
    sqlx::query_as::<_, ChapterRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_chapters_by_story(
    pool: &Db,
    story_id: &StoryId,
) -> Result<Vec<ChapterRow>, sqlx::Error> {
    let q = sql("SELECT * FROM chapters WHERE story_id = ? ORDER BY \"order\" ASC");
    sqlx::query_as::<_, ChapterRow>(&q)
        .bind(story_id.as_str())
        .fetch_all(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn update_chapter(
    pool: &Db,
    id: &ChapterId,
    title: &str,
    image_url: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let q = sql(
        "UPDATE chapters SET title = ?, image_url = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    );
    let result = sqlx::query(&q)
        .bind(title)
        .bind(image_url)
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// デフォルト章はストーリーの土台なので消せない。
#[tracing::instrument(skip(pool), err)]
pub async fn delete_chapter(pool: &Db, id: &ChapterId) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM chapters WHERE id = ? AND is_default = ?");
    let result = sqlx::query(&q)
        .bind(id.as_str())
        .bind(false)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    async fn seed_story(pool: &Db) -> (StoryId, UserId) {
        insert_profile(pool, "creator", "creator@example.com").await;
        let story_id = StoryId::new_v4();
        let creator = UserId("creator".into());
        crate::db::stories::create_story(pool, &story_id, "Test", None, &creator)
            .await
            .unwrap();
        (story_id, creator)
    }

    #[tokio::test]
    async fn sequential_orders_are_gapless() {
        let pool = test_pool().await;
        let (story_id, creator) = seed_story(&pool).await;

        // シード章がorder=1を占める
        for i in 0..4 {
            create_chapter(
                &pool,
                &ChapterId::new_v4(),
                &story_id,
                &format!("Chapter {}", i + 2),
                None,
                &creator,
            )
            .await
            .unwrap();
        }

        let orders: Vec<i32> = get_chapters_by_story(&pool, &story_id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn order_is_scoped_per_story() {
        let pool = test_pool().await;
        let (story_a, creator) = seed_story(&pool).await;
        let story_b = StoryId::new_v4();
        crate::db::stories::create_story(&pool, &story_b, "Other", None, &creator)
            .await
            .unwrap();

        let in_a = create_chapter(&pool, &ChapterId::new_v4(), &story_a, "A2", None, &creator)
            .await
            .unwrap();
        let in_b = create_chapter(&pool, &ChapterId::new_v4(), &story_b, "B2", None, &creator)
            .await
            .unwrap();
        assert_eq!(in_a.order, 2);
        assert_eq!(in_b.order, 2);
    }

    #[tokio::test]
    async fn default_chapter_refuses_deletion() {
        let pool = test_pool().await;
        let (story_id, creator) = seed_story(&pool).await;

        let chapters = get_chapters_by_story(&pool, &story_id).await.unwrap();
        let seed = ChapterId(chapters[0].id.clone());
        assert!(!delete_chapter(&pool, &seed).await.unwrap());

        let extra = create_chapter(&pool, &ChapterId::new_v4(), &story_id, "C2", None, &creator)
            .await
            .unwrap();
        assert!(delete_chapter(&pool, &ChapterId(extra.id)).await.unwrap());
    }

    #[tokio::test]
    async fn second_default_chapter_is_rejected() {
        let pool = test_pool().await;
        let (story_id, _) = seed_story(&pool).await;

        // 部分一意インデックスがストーリーごとのシード章を1つに保つ
        let res = sqlx::query(
            "INSERT INTO chapters (id, title, \"order\", story_id, is_default) \
             VALUES ('dup', 'Dup', 99, ?, 1)",
        )
        .bind(story_id.as_str())
        .execute(&pool)
        .await;
        assert!(res.is_err());
    }
}
