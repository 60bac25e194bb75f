use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::error::AppError;
use crate::storage;
use crate::types::MediaId;

const MEGABYTE: u64 = 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/media", post(upload_media))
        .route("/media/register", post(register_media))
        .route("/media/usage", get(usage))
        .route("/media/{id}", get(get_media))
        .route("/media/{id}/content", get(get_content))
        // サイズ上限は設定値なのでハンドラ側で413を返す
        .layer(DefaultBodyLimit::disable())
}

/// is_video と実際に入っているURLの整合を検査する。動画なら video_url
/// のみ、画像なら image_url のみが埋まっていなければならない。
pub(crate) fn check_url_agreement(
    is_video: bool,
    image_url: Option<&str>,
    video_url: Option<&str>,
) -> Result<(), AppError> {
    let ok = if is_video {
        video_url.is_some() && image_url.is_none()
    } else {
        image_url.is_some() && video_url.is_none()
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "is_video does not agree with the provided URLs".into(),
        ))
    }
}

/// multipart の `file` フィールドをS3へ置き、media行と使用量を記録する。
async fn upload_media(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut upload: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;
        upload = Some((data.to_vec(), content_type));
    }
    let Some((data, content_type)) = upload else {
        return Err(AppError::BadRequest("missing 'file' field".into()));
    };

    let limit_bytes = state.config.max_upload_megabytes * MEGABYTE;
    if data.len() as u64 > limit_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "upload exceeds {} MB",
            state.config.max_upload_megabytes
        )));
    }

    let is_video = content_type.starts_with("video/");
    let size_bytes = data.len() as i64;
    let size_mega_bytes = data.len() as f64 / MEGABYTE as f64;

    let id = MediaId::new_v4();
    let key = storage::media_key(&id);
    state
        .storage
        .put_object(&key, data, &content_type)
        .await
        .map_err(AppError::Internal)?;

    let public_url = format!("{}/{}/content", state.config.media_base_url, id.as_str());
    let (image_url, video_url) = if is_video {
        (None, Some(public_url.as_str()))
    } else {
        (Some(public_url.as_str()), None)
    };
    let media = db::media::create_media(
        &state.pool,
        &id,
        image_url,
        video_url,
        is_video,
        size_mega_bytes,
        Some(&key),
    )
    .await?;
    db::media::record_upload(&state.pool, &auth.user_id, &key, size_bytes).await?;

    Ok(Json(serde_json::json!(media)))
}

#[derive(Deserialize)]
struct RegisterMediaBody {
    image_url: Option<String>,
    video_url: Option<String>,
    is_video: bool,
    #[serde(default)]
    media_size_mega_bytes: f64,
}

/// 外部ホストのURLをmedia行として登録する（バイト列は預からない）。
async fn register_media(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Json(body): Json<RegisterMediaBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_url_agreement(
        body.is_video,
        body.image_url.as_deref(),
        body.video_url.as_deref(),
    )?;

    let media = db::media::create_media(
        &state.pool,
        &MediaId::new_v4(),
        body.image_url.as_deref(),
        body.video_url.as_deref(),
        body.is_video,
        body.media_size_mega_bytes,
        None,
    )
    .await?;
    Ok(Json(serde_json::json!(media)))
}

async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let media = db::media::get_media(&state.pool, &MediaId(id))
        .await?
        .ok_or_else(|| AppError::NotFound("media not found".into()))?;
    Ok(Json(serde_json::json!(media)))
}

async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let media = db::media::get_media(&state.pool, &MediaId(id))
        .await?
        .ok_or_else(|| AppError::NotFound("media not found".into()))?;
    let Some(key) = &media.s3_key else {
        // 外部ホストのメディアはここからは配信しない
        return Err(AppError::NotFound("media has no stored content".into()));
    };

    let data = state
        .storage
        .get_object(key)
        .await
        .map_err(AppError::Internal)?;
    let content_type = if media.is_video {
        "video/mp4"
    } else {
        "image/jpeg"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

async fn usage(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let total = db::media::total_upload_bytes(&state.pool, &auth.user_id).await?;
    Ok(Json(serde_json::json!({ "total_upload_bytes": total })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_agreement_accepts_matching_pairs() {
        assert!(check_url_agreement(false, Some("http://x/a.jpg"), None).is_ok());
        assert!(check_url_agreement(true, None, Some("http://x/a.mp4")).is_ok());
    }

    #[test]
    fn url_agreement_rejects_mismatches() {
        assert!(check_url_agreement(true, Some("http://x/a.jpg"), None).is_err());
        assert!(check_url_agreement(false, None, Some("http://x/a.mp4")).is_err());
        assert!(check_url_agreement(false, None, None).is_err());
        assert!(
            check_url_agreement(true, Some("http://x/a.jpg"), Some("http://x/a.mp4")).is_err()
        );
    }
}
