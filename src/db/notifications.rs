use super::models::{NotificationRow, UserDeviceRow};
use super::{Db, sql};
use crate::types::{NotificationId, UserId};

pub struct NewNotification<'a> {
    pub to_user: &'a UserId,
    pub from_user: Option<&'a UserId>,
    pub story_id: Option<&'a str>,
    pub moment_id: Option<&'a str>,
    pub title: &'a str,
    pub message: &'a str,
    pub redirect_url: Option<&'a str>,
}

#[tracing::instrument(skip(pool, n), err)]
pub async fn create_notification(pool: &Db, n: &NewNotification<'_>) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO notifications (id, to_user_id, from_user_id, story_id, moment_id, title, message, redirect_url) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(NotificationId::new_v4().as_str())
        .bind(n.to_user.as_str())
        .bind(n.from_user.map(|u| u.as_str()))
        .bind(n.story_id)
        .bind(n.moment_id)
        .bind(n.title)
        .bind(n.message)
        .bind(n.redirect_url)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_notifications(
    pool: &Db,
    to_user: &UserId,
) -> Result<Vec<NotificationRow>, sqlx::Error> {
    let q = sql("SELECT * FROM notifications WHERE to_user_id = ? ORDER BY created_at DESC");
    sqlx::query_as::<_, NotificationRow>(&q)
        .bind(to_user.as_str())
        .fetch_all(pool)
        .await
}

/// 既読化は本人の行に限る。
#[tracing::instrument(skip(pool), err)]
pub async fn mark_read(
    pool: &Db,
    id: &NotificationId,
    to_user: &UserId,
) -> Result<bool, sqlx::Error> {
    let q = sql("UPDATE notifications SET is_read = ? WHERE id = ? AND to_user_id = ?");
    let result = sqlx::query(&q)
        .bind(true)
        .bind(id.as_str())
        .bind(to_user.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// 同一トークンの再登録はチャネル種別の更新として扱う。
#[tracing::instrument(skip(pool, device_token), err)]
pub async fn upsert_device(
    pool: &Db,
    user_id: &UserId,
    device_token: &str,
    channel_type: &str,
) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO user_devices (id, user_id, device_token, channel_type) VALUES (?, ?, ?, ?) \
         ON CONFLICT (user_id, device_token) DO UPDATE SET channel_type = excluded.channel_type",
    );
    sqlx::query(&q)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id.as_str())
        .bind(device_token)
        .bind(channel_type)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool, device_token), err)]
pub async fn delete_device(
    pool: &Db,
    user_id: &UserId,
    device_token: &str,
) -> Result<bool, sqlx::Error> {
    let q = sql("DELETE FROM user_devices WHERE user_id = ? AND device_token = ?");
    let result = sqlx::query(&q)
        .bind(user_id.as_str())
        .bind(device_token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_devices(pool: &Db, user_id: &UserId) -> Result<Vec<UserDeviceRow>, sqlx::Error> {
    let q = sql("SELECT * FROM user_devices WHERE user_id = ? ORDER BY created_at ASC");
    sqlx::query_as::<_, UserDeviceRow>(&q)
        .bind(user_id.as_str())
        .fetch_all(pool)
        .await
}
