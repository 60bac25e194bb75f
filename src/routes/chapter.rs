use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::{AnswerRow, MediaRow, MomentRow, PublicProfile, QuestionRow};
use crate::error::AppError;
use crate::routes::story::{require_member, require_owner};
use crate::types::{ChapterId, SharedUrlId, StoryId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/story/{id}/chapters", post(create_chapter))
        .route(
            "/chapter/{id}",
            get(get_chapter).post(update_chapter).delete(delete_chapter),
        )
        .route("/chapter/{id}/share", post(share_chapter))
}

#[derive(Deserialize)]
struct CreateChapterBody {
    title: String,
    image_url: Option<String>,
}

async fn create_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateChapterBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let story_id = StoryId(id);
    require_member(&state.pool, &story_id, &auth.user_id).await?;

    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }

    let chapter = db::chapters::create_chapter(
        &state.pool,
        &ChapterId::new_v4(),
        &story_id,
        body.title.trim(),
        body.image_url.as_deref(),
        &auth.user_id,
    )
    .await?;
    Ok(Json(serde_json::json!(chapter)))
}

/// 章ビュー: 章本体＋並び順どおりのモーメント（メディア同梱）＋
/// 質問（質問者プロフィールと回答つき、未回答/回答済みに分けて返す）。
async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let chapter_id = ChapterId(id);

    let chapter = db::chapters::get_chapter(&state.pool, &chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound("chapter not found".into()))?;
    let story_id = StoryId(chapter.story_id.clone());
    require_member(&state.pool, &story_id, &auth.user_id).await?;

    let moments = db::moments::get_moments_by_chapter(&state.pool, &chapter_id).await?;
    let moments = attach_media(&state.pool, moments).await?;

    let questions = db::questions::get_questions_by_chapter(&state.pool, &chapter_id).await?;
    let questions = attach_askers_and_answers(&state.pool, questions).await?;
    let (unanswered, answered): (Vec<_>, Vec<_>) =
        questions.into_iter().partition(|q| q.answers.is_empty());

    let shared_urls = db::shared_urls::get_shared_urls_by_chapter(&state.pool, &chapter_id).await?;

    Ok(Json(serde_json::json!({
        "chapter": chapter,
        "moments": moments,
        "questions": { "unanswered": unanswered, "answered": answered },
        "shared_urls": shared_urls,
    })))
}

#[derive(serde::Serialize)]
struct MomentWithMedia {
    #[serde(flatten)]
    moment: MomentRow,
    media: Option<MediaRow>,
}

/// モーメント列にメディア行を付ける。id集合で1クエリ取得してマージ。
async fn attach_media(
    pool: &db::Db,
    moments: Vec<MomentRow>,
) -> Result<Vec<MomentWithMedia>, AppError> {
    let media_ids: Vec<String> = moments.iter().filter_map(|m| m.media_id.clone()).collect();
    let mut by_id: HashMap<String, MediaRow> = db::media::get_media_by_ids(pool, &media_ids)
        .await?
        .into_iter()
        .map(|m| (m.id.clone(), m))
        .collect();

    Ok(moments
        .into_iter()
        .map(|moment| {
            let media = moment.media_id.as_ref().and_then(|id| by_id.remove(id));
            MomentWithMedia { moment, media }
        })
        .collect())
}

#[derive(serde::Serialize)]
pub(crate) struct QuestionDetail {
    #[serde(flatten)]
    pub(crate) question: QuestionRow,
    pub(crate) asker: Option<PublicProfile>,
    pub(crate) answers: Vec<AnswerRow>,
}

/// 質問列に質問者プロフィールと回答を付ける。どちらもIN句のバッチ。
pub(crate) async fn attach_askers_and_answers(
    pool: &db::Db,
    questions: Vec<QuestionRow>,
) -> Result<Vec<QuestionDetail>, AppError> {
    let question_ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
    let mut answers_by_question: HashMap<String, Vec<AnswerRow>> = HashMap::new();
    for answer in db::questions::get_answers_for_questions(pool, &question_ids).await? {
        answers_by_question
            .entry(answer.question_id.clone())
            .or_default()
            .push(answer);
    }

    let asker_ids: Vec<String> = questions
        .iter()
        .filter_map(|q| q.user_id.clone())
        .collect();
    let askers: HashMap<String, PublicProfile> =
        db::profiles::get_public_profiles(pool, &asker_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

    Ok(questions
        .into_iter()
        .map(|question| {
            let asker = question.user_id.as_ref().and_then(|id| askers.get(id).cloned());
            let answers = answers_by_question.remove(&question.id).unwrap_or_default();
            QuestionDetail {
                question,
                asker,
                answers,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct UpdateChapterBody {
    title: String,
    image_url: Option<String>,
}

async fn update_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<UpdateChapterBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let chapter_id = ChapterId(id);

    let chapter = db::chapters::get_chapter(&state.pool, &chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound("chapter not found".into()))?;
    require_member(&state.pool, &StoryId(chapter.story_id), &auth.user_id).await?;

    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    db::chapters::update_chapter(
        &state.pool,
        &chapter_id,
        body.title.trim(),
        body.image_url.as_deref(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

async fn delete_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let chapter_id = ChapterId(id);

    let chapter = db::chapters::get_chapter(&state.pool, &chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound("chapter not found".into()))?;
    require_owner(&state.pool, &StoryId(chapter.story_id), &auth.user_id).await?;

    if chapter.is_default {
        return Err(AppError::BadRequest(
            "the default chapter cannot be deleted".into(),
        ));
    }
    db::chapters::delete_chapter(&state.pool, &chapter_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn share_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let chapter_id = ChapterId(id);

    let chapter = db::chapters::get_chapter(&state.pool, &chapter_id)
        .await?
        .ok_or_else(|| AppError::NotFound("chapter not found".into()))?;
    let story_id = StoryId(chapter.story_id);
    require_member(&state.pool, &story_id, &auth.user_id).await?;

    let slug = uuid::Uuid::new_v4().to_string();
    let url = format!("{}/{slug}", state.config.share_base_url);
    let shared = db::shared_urls::create_shared_url(
        &state.pool,
        &SharedUrlId::new_v4(),
        &url,
        &story_id,
        &chapter_id,
        &auth.user_id,
    )
    .await?;
    Ok(Json(serde_json::json!(shared)))
}
