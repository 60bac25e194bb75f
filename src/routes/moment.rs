use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::notifications::NewNotification;
use crate::error::AppError;
use crate::routes::story::require_member;
use crate::types::{ChapterId, MediaId, MomentId, StoryId, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chapter/{id}/moments", post(create_moment))
        .route(
            "/moment/{id}",
            get(get_moment).post(update_moment).delete(delete_moment),
        )
}

#[derive(Deserialize)]
struct CreateMomentBody {
    title: String,
    #[serde(default)]
    description: String,
    media_id: Option<String>,
    #[serde(default)]
    tagged_user_ids: Vec<String>,
}

async fn create_moment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateMomentBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let chapter_id = ChapterId(id);

    let chapter = db::chapters::get_chapter(&state.pool, &chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound("chapter not found".into()))?;
    // story_id は章の行から引き写す（不変条件: モーメントと章のストーリー一致）
    let story_id = StoryId(chapter.story_id);
    require_member(&state.pool, &story_id, &auth.user_id).await?;

    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }

    let media_id = body.media_id.map(MediaId);
    if let Some(media_id) = &media_id {
        if db::media::get_media(&state.pool, media_id).await?.is_none() {
            return Err(AppError::BadRequest("media not found".into()));
        }
        // メディアは高々1つのモーメントに紐付く
        if db::moments::is_media_claimed(&state.pool, media_id).await? {
            return Err(AppError::Conflict(
                "media is already attached to another moment".into(),
            ));
        }
    }

    let tagged: Vec<UserId> = body.tagged_user_ids.into_iter().map(UserId).collect();
    for user in &tagged {
        if !db::members::is_member(&state.pool, &story_id, user).await? {
            return Err(AppError::BadRequest(format!(
                "tagged user {} is not a member of this story",
                user.as_str()
            )));
        }
    }

    // モーメント本体とタグ行は同一トランザクションで書かれる
    let moment = db::moments::create_moment(
        &state.pool,
        &MomentId::new_v4(),
        &chapter_id,
        &story_id,
        body.title.trim(),
        &body.description,
        media_id.as_ref(),
        &auth.user_id,
        &tagged,
    )
    .await?;

    let moment_id = MomentId(moment.id.clone());
    for user in &tagged {
        if user == &auth.user_id {
            continue;
        }
        db::notifications::create_notification(
            &state.pool,
            &NewNotification {
                to_user: user,
                from_user: Some(&auth.user_id),
                story_id: Some(story_id.as_str()),
                moment_id: Some(moment_id.as_str()),
                title: "You were tagged",
                message: &format!("You were tagged in \"{}\"", moment.title),
                redirect_url: Some(&format!("/chapter/{}", chapter_id.as_str())),
            },
        )
        .await?;
    }

    Ok(Json(serde_json::json!(moment)))
}

async fn get_moment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let moment_id = MomentId(id);

    let moment = db::moments::get_moment(&state.pool, &moment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("moment not found".into()))?;
    require_member(&state.pool, &StoryId(moment.story_id.clone()), &auth.user_id).await?;

    let media = match &moment.media_id {
        Some(media_id) => db::media::get_media(&state.pool, &MediaId(media_id.clone())).await?,
        None => None,
    };
    let tagged = db::moments::get_tagged_profiles(&state.pool, &moment_id).await?;

    Ok(Json(serde_json::json!({
        "moment": moment,
        "media": media,
        "tagged_users": tagged,
    })))
}

/// 編集・削除は投稿者本人かストーリーオーナーに限る。
async fn require_author_or_owner(
    pool: &db::Db,
    moment: &db::models::MomentRow,
    caller: &UserId,
) -> Result<(), AppError> {
    if moment.user_id.as_deref() == Some(caller.as_str()) {
        return Ok(());
    }
    let story_id = StoryId(moment.story_id.clone());
    if db::members::is_owner(pool, &story_id, caller).await? {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "only the author or a story owner can modify a moment".into(),
    ))
}

#[derive(Deserialize)]
struct UpdateMomentBody {
    title: String,
    #[serde(default)]
    description: String,
}

async fn update_moment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<UpdateMomentBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let moment_id = MomentId(id);

    let moment = db::moments::get_moment(&state.pool, &moment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("moment not found".into()))?;
    require_author_or_owner(&state.pool, &moment, &auth.user_id).await?;

    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    db::moments::update_moment(&state.pool, &moment_id, body.title.trim(), &body.description)
        .await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

async fn delete_moment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let moment_id = MomentId(id);

    let moment = db::moments::get_moment(&state.pool, &moment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("moment not found".into()))?;
    require_author_or_owner(&state.pool, &moment, &auth.user_id).await?;

    db::moments::delete_moment(&state.pool, &moment_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
