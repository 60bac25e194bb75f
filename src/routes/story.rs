use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::members::RedeemOutcome;
use crate::db::notifications::NewNotification;
use crate::error::AppError;
use crate::types::{StoryId, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stories", get(list_stories).post(create_story))
        .route(
            "/story/{id}",
            get(get_story).post(update_story).delete(delete_story),
        )
        .route("/story/{id}/rotate-codes", post(rotate_codes))
        .route("/story/{id}/members/{member_id}", delete(remove_member))
        .route("/story/join", post(join_story))
}

/// ストーリー単位の会員check。行がなければ403。
pub(crate) async fn require_member(
    pool: &db::Db,
    story_id: &StoryId,
    user_id: &UserId,
) -> Result<(), AppError> {
    if !db::members::is_member(pool, story_id, user_id).await? {
        return Err(AppError::Forbidden("not a member of this story".into()));
    }
    Ok(())
}

/// 管理操作のcheck。story_owners 行の有無だけを見る。
pub(crate) async fn require_owner(
    pool: &db::Db,
    story_id: &StoryId,
    user_id: &UserId,
) -> Result<(), AppError> {
    if !db::members::is_owner(pool, story_id, user_id).await? {
        return Err(AppError::Forbidden(
            "only story owners can manage the story".into(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct CreateStoryBody {
    title: String,
    image_url: Option<String>,
}

async fn create_story(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateStoryBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }

    let story_id = StoryId::new_v4();
    db::stories::create_story(
        &state.pool,
        &story_id,
        body.title.trim(),
        body.image_url.as_deref(),
        &auth.user_id,
    )
    .await?;

    let story = db::stories::get_story(&state.pool, &story_id).await?;
    Ok(Json(serde_json::json!(story)))
}

async fn list_stories(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let stories = db::stories::get_stories_for_user(&state.pool, &auth.user_id).await?;
    Ok(Json(serde_json::json!(stories)))
}

async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);

    let story = db::stories::get_story(&state.pool, &story_id)
        .await?
        .ok_or_else(|| AppError::NotFound("story not found".into()))?;
    require_member(&state.pool, &story_id, &auth.user_id).await?;

    let chapters = db::chapters::get_chapters_by_story(&state.pool, &story_id).await?;
    let members = db::members::get_members(&state.pool, &story_id).await?;
    let is_owner = db::members::is_owner(&state.pool, &story_id, &auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "story": story,
        "chapters": chapters,
        "members": members,
        "is_owner": is_owner,
    })))
}

#[derive(Deserialize)]
struct UpdateStoryBody {
    title: String,
    image_url: Option<String>,
    locked: bool,
}

async fn update_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<UpdateStoryBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);
    require_owner(&state.pool, &story_id, &auth.user_id).await?;

    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let updated = db::stories::update_story(
        &state.pool,
        &story_id,
        body.title.trim(),
        body.image_url.as_deref(),
        body.locked,
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound("story not found".into()));
    }
    Ok(Json(serde_json::json!({ "updated": true })))
}

#[derive(Deserialize)]
struct RotateCodesBody {
    #[serde(default)]
    member_code: bool,
    #[serde(default)]
    owner_code: bool,
}

/// コード再発行。既存メンバーの資格はそのまま。
async fn rotate_codes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<RotateCodesBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);
    require_owner(&state.pool, &story_id, &auth.user_id).await?;

    if !body.member_code && !body.owner_code {
        return Err(AppError::BadRequest("nothing to rotate".into()));
    }
    db::stories::rotate_invite_codes(&state.pool, &story_id, body.member_code, body.owner_code)
        .await?;
    let story = db::stories::get_story(&state.pool, &story_id).await?;
    Ok(Json(serde_json::json!(story)))
}

async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);
    require_owner(&state.pool, &story_id, &auth.user_id).await?;

    db::stories::delete_story(&state.pool, &story_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn remove_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);
    require_owner(&state.pool, &story_id, &auth.user_id).await?;

    if !db::members::remove_member(&state.pool, &story_id, &member_id).await? {
        return Err(AppError::NotFound("member not found".into()));
    }
    Ok(Json(serde_json::json!({ "removed": true })))
}

#[derive(Deserialize)]
struct JoinBody {
    code: String,
}

async fn join_story(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<JoinBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = db::members::redeem_invite(&state.pool, body.code.trim(), &auth.user_id).await?;
    let (story_id, as_owner) = match outcome {
        RedeemOutcome::Joined { story_id, as_owner } => (story_id, as_owner),
        RedeemOutcome::UnknownCode => {
            return Err(AppError::NotFound("invite code not found".into()));
        }
        RedeemOutcome::Locked => {
            return Err(AppError::Forbidden("story is locked to new members".into()));
        }
        RedeemOutcome::AlreadyMember => {
            return Err(AppError::Conflict("already a member of this story".into()));
        }
    };

    // ストーリー作成者に参加を知らせる（作成者が退会済みならスキップ）
    let story = db::stories::get_story(&state.pool, &story_id).await?;
    if let Some(story) = &story
        && let Some(creator) = &story.user_id
        && creator != auth.user_id.as_str()
    {
        let creator = UserId(creator.clone());
        db::notifications::create_notification(
            &state.pool,
            &NewNotification {
                to_user: &creator,
                from_user: Some(&auth.user_id),
                story_id: Some(story_id.as_str()),
                moment_id: None,
                title: "New member",
                message: &format!("Someone joined \"{}\"", story.title),
                redirect_url: Some(&format!("/story/{}", story_id.as_str())),
            },
        )
        .await?;
    }

    Ok(Json(serde_json::json!({
        "story_id": story_id.as_str(),
        "role": if as_owner { "owner" } else { "member" },
    })))
}
