use super::models::SharedUrlRow;
use super::{Db, sql};
use crate::types::{ChapterId, SharedUrlId, StoryId, UserId};

#[tracing::instrument(skip(pool), err)]
pub async fn create_shared_url(
    pool: &Db,
    id: &SharedUrlId,
    url: &str,
    story_id: &StoryId,
    chapter_id: &ChapterId,
    user_id: &UserId,
) -> Result<SharedUrlRow, sqlx::Error> {
    let q = sql(
        "INSERT INTO shared_urls (id, url, story_id, chapter_id, user_id, is_ready) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(url)
        .bind(story_id.as_str())
        .bind(chapter_id.as_str())
        .bind(user_id.as_str())
        .bind(true)
        .execute(pool)
        .await?;

    let q = sql("SELECT * FROM shared_urls WHERE id = ?");
    sqlx::query_as::<_, SharedUrlRow>(&q)
        .bind(id.as_str())
        .fetch_one(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_shared_urls_by_chapter(
    pool: &Db,
    chapter_id: &ChapterId,
) -> Result<Vec<SharedUrlRow>, sqlx::Error> {
    let q = sql("SELECT * FROM shared_urls WHERE chapter_id = ? ORDER BY created_at DESC");
    sqlx::query_as::<_, SharedUrlRow>(&q)
        .bind(chapter_id.as_str())
        .fetch_all(pool)
        .await
}
