use super::models::MediaRow;
use super::{Db, in_placeholders, sql};
use crate::types::{MediaId, UserId};

/// is_video と設定されるURLの整合はCHECK制約にもあるが、呼び出し側が
/// `check_url_agreement` で先に検証して400を返す。
#[tracing::instrument(skip(pool), err)]
pub async fn create_media(
    pool: &Db,
    id: &MediaId,
    image_url: Option<&str>,
    video_url: Option<&str>,
    is_video: bool,
    media_size_mega_bytes: f64,
    s3_key: Option<&str>,
) -> Result<MediaRow, sqlx::Error> {
    let q = sql(
        "INSERT INTO media (id, image_url, video_url, is_video, media_size_mega_bytes, s3_key) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(image_url)
        .bind(video_url)
        .bind(is_video)
        .bind(media_size_mega_bytes)
        .bind(s3_key)
        .execute(pool)
        .await?;

    let q = sql("SELECT * FROM media WHERE id = ?");
    sqlx::query_as::<_, MediaRow>(&q)
        .bind(id.as_str())
        .fetch_one(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_media(pool: &Db, id: &MediaId) -> Result<Option<MediaRow>, sqlx::Error> {
    let q = sql("SELECT * FROM media WHERE id = ?");
    sqlx::query_as::<_, MediaRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

/// 複数idのメディアを1クエリで取得（章ビューのバッチ用）
#[tracing::instrument(skip(pool, ids), err)]
pub async fn get_media_by_ids(pool: &Db, ids: &[String]) -> Result<Vec<MediaRow>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = format!(
        "SELECT * FROM media WHERE id IN ({})",
        in_placeholders(ids.len())
    );
    let q = sql(&stmt);
    let mut query = sqlx::query_as::<_, MediaRow>(&q);
    for id in ids {
        query = query.bind(id);
    }
    query.fetch_all(pool).await
}

#[tracing::instrument(skip(pool), err)]
pub async fn record_upload(
    pool: &Db,
    user_id: &UserId,
    s3_key: &str,
    file_size_bytes: i64,
) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO storage_statistics (id, user_id, s3_key, file_size_bytes) VALUES (?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id.as_str())
        .bind(s3_key)
        .bind(file_size_bytes)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn total_upload_bytes(pool: &Db, user_id: &UserId) -> Result<i64, sqlx::Error> {
    let q = sql(
        "SELECT CAST(COALESCE(SUM(file_size_bytes), 0) AS BIGINT) \
         FROM storage_statistics WHERE user_id = ?",
    );
    let (total,): (i64,) = sqlx::query_as(&q)
        .bind(user_id.as_str())
        .fetch_one(pool)
        .await?;
    Ok(total)
}
