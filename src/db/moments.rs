use super::models::{MomentRow, PublicProfile};
use super::{Db, sql};
use crate::types::{ChapterId, MediaId, MomentId, StoryId, UserId};

/// Create a moment, with its tag rows, in one transaction.
/// 採番は章と同じ方式（INSERT内のMAX+1＋一意制約）。story_id は
/// 呼び出し側が章の行から引き写す（クライアントの値は信用しない）。
/// タグ行の挿入が失敗したらモーメント本体も残らない。
#[tracing::instrument(skip(pool, tagged), err)]
pub async fn create_moment(
    pool: &Db,
    id: &MomentId,
    chapter_id: &ChapterId,
    story_id: &StoryId,
    title: &str,
    description: &str,
    media_id: Option<&MediaId>,
    created_by: &UserId,
    tagged: &[UserId],
) -> Result<MomentRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let q = sql(
        "INSERT INTO moments (id, title, description, \"order\", chapter_id, story_id, media_id, user_id) \
         VALUES (?, ?, ?, (SELECT COALESCE(MAX(\"order\"), 0) + 1 FROM moments WHERE chapter_id = ?), ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(title)
        .bind(description)
        .bind(chapter_id.as_str())
        .bind(chapter_id.as_str())
        .bind(story_id.as_str())
        .bind(media_id.map(|m| m.as_str()))
        .bind(created_by.as_str())
        .execute(&mut *tx)
        .await?;

    let q = sql("INSERT INTO moment_tagged_users (id, moment_id, user_id) VALUES (?, ?, ?)");
    for user_id in tagged {
        sqlx::query(&q)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let q = sql("SELECT * FROM moments WHERE id = ?");
    sqlx::query_as::<_, MomentRow>(&q)
        .bind(id.as_str())
        .fetch_one(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_moment(pool: &Db, id: &MomentId) -> Result<Option<MomentRow>, sqlx::Error> {
    let q = sql("SELECT * FROM moments WHERE id = ?");
    sqlx::query_as::<_, MomentRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_moments_by_chapter(
    pool: &Db,
    chapter_id: &ChapterId,
) -> Result<Vec<MomentRow>, sqlx::Error> {
    let q = sql("SELECT * FROM moments WHERE chapter_id = ? ORDER BY \"order\" ASC");
    sqlx::query_as::<_, MomentRow>(&q)
        .bind(chapter_id.as_str())
        .fetch_all(pool)
        .await
}

/// メディアが既に別のモーメントに紐付いているか（1対1不変条件の検査）
#[tracing::instrument(skip(pool), err)]
pub async fn is_media_claimed(pool: &Db, media_id: &MediaId) -> Result<bool, sqlx::Error> {
    let q = sql("SELECT 1 FROM moments WHERE media_id = ?");
    let row: Option<(i32,)> = sqlx::query_as(&q)
        .bind(media_id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

#[tracing::instrument(skip(pool), err)]
pub async fn update_moment(
    pool: &Db,
    id: &MomentId,
    title: &str,
    description: &str,
) -> Result<bool, sqlx::Error> {
    let q = sql(
        "UPDATE moments SET title = ?, description = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    );
    let result = sqlx::query(&q)
        .bind(title)
        .bind(description)
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool), err)]
pub async fn delete_moment(pool: &Db, id: &MomentId) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM moments WHERE id = ?");
    let result = sqlx::query(&q).bind(id.as_str()).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_tagged_profiles(
    pool: &Db,
    moment_id: &MomentId,
) -> Result<Vec<PublicProfile>, sqlx::Error> {
    let q = sql(
        "SELECT p.id, p.name, p.last_name, p.image_url \
         FROM moment_tagged_users mt JOIN profiles p ON p.id = mt.user_id \
         WHERE mt.moment_id = ?",
    );
    sqlx::query_as::<_, PublicProfile>(&q)
        .bind(moment_id.as_str())
        .fetch_all(pool)
        .await
}
