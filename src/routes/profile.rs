use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::{PublicProfile, RelationshipRow};
use crate::error::AppError;
use crate::types::{RelationshipId, UserId};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile/{id}", get(get_profile).post(update_profile))
        .route("/relationships", post(create_relationship))
        .route("/relationship/{id}", axum::routing::delete(delete_relationship))
}

#[derive(serde::Serialize)]
struct RelationshipWithProfile {
    #[serde(flatten)]
    relationship: RelationshipRow,
    with_profile: PublicProfile,
}

/// プロフィールビュー: 本人情報＋参加ストーリー＋つながり。
/// つながり先のプロフィールはid集合で1クエリ取得してマージする。
/// 相手が退会済みなら空のスタブで埋める。
async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = UserId(id);

    let profile = db::profiles::get_profile(&state.pool, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile not found".into()))?;
    let stories = db::stories::get_stories_for_user(&state.pool, &user_id).await?;
    let relationships = db::relationships::get_relationships(&state.pool, &user_id).await?;

    let with_ids: Vec<String> = relationships.iter().map(|r| r.with_user.clone()).collect();
    let profiles: HashMap<String, PublicProfile> =
        db::profiles::get_public_profiles(&state.pool, &with_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
    let relationships: Vec<RelationshipWithProfile> = relationships
        .into_iter()
        .map(|relationship| {
            let with_profile = profiles
                .get(&relationship.with_user)
                .cloned()
                .unwrap_or_else(|| PublicProfile::missing(&relationship.with_user));
            RelationshipWithProfile {
                relationship,
                with_profile,
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "profile": profile,
        "stories": stories,
        "relationships": relationships,
    })))
}

#[derive(Deserialize)]
struct UpdateProfileBody {
    name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    bio: String,
    image_url: Option<String>,
    #[serde(default)]
    is_account_protected: bool,
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = UserId(id);
    if user_id != auth.user_id {
        return Err(AppError::Forbidden(
            "profiles can only be edited by their owner".into(),
        ));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let updated = db::profiles::update_profile(
        &state.pool,
        &user_id,
        body.name.trim(),
        body.last_name.trim(),
        &body.bio,
        body.image_url.as_deref(),
        body.is_account_protected,
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound("profile not found".into()));
    }
    Ok(Json(serde_json::json!({ "updated": true })))
}

#[derive(Deserialize)]
struct CreateRelationshipBody {
    with_user: String,
    relation: String,
}

async fn create_relationship(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateRelationshipBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.relation.trim().is_empty() {
        return Err(AppError::BadRequest("relation is required".into()));
    }
    let id = RelationshipId::new_v4();
    db::relationships::create_relationship(
        &state.pool,
        &id,
        &auth.user_id,
        &body.with_user,
        body.relation.trim(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn delete_relationship(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    // 自分の行しか消せない
    let deleted =
        db::relationships::delete_relationship(&state.pool, &RelationshipId(id), &auth.user_id)
            .await?;
    if !deleted {
        return Err(AppError::NotFound("relationship not found".into()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
