use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{self, AuthenticatedUser};
use crate::db;
use crate::error::AppError;
use crate::types::{UserId, validate_email};

const MIN_PASSWORD_LEN: usize = 8;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
struct SignupBody {
    email: String,
    password: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    last_name: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_email(&body.email).map_err(AppError::BadRequest)?;
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if db::profiles::get_profile_by_email(&state.pool, &body.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("email already registered".into()));
    }

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?;
    let user_id = UserId::new_v4();
    db::profiles::create_profile(
        &state.pool,
        &user_id,
        &body.email,
        &password_hash,
        &body.name,
        &body.last_name,
    )
    .await?;

    let token = auth::issue_session(&state.pool, &user_id).await?;
    Ok(Json(
        serde_json::json!({ "token": token, "user_id": user_id.as_str() }),
    ))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    // どちらが間違っていたかは明かさない
    let denied = || AppError::Unauthorized("invalid email or password".into());

    let profile = db::profiles::get_profile_by_email(&state.pool, &body.email)
        .await?
        .ok_or_else(denied)?;
    if !bcrypt::verify(&body.password, &profile.password_hash)? {
        return Err(denied());
    }

    let user_id = UserId(profile.id);
    let token = auth::issue_session(&state.pool, &user_id).await?;
    Ok(Json(
        serde_json::json!({ "token": token, "user_id": user_id.as_str() }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    db::sessions::delete_session(&state.pool, &auth.token_hash).await?;
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

async fn me(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = db::profiles::get_profile(&state.pool, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile not found".into()))?;
    Ok(Json(serde_json::json!(profile)))
}
