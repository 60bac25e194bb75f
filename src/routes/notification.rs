use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::error::AppError;
use crate::types::NotificationId;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notification/{id}/read", post(mark_read))
        .route("/device", post(register_device).delete(unregister_device))
        .route("/devices", get(list_devices))
}

async fn list(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let notifications = db::notifications::get_notifications(&state.pool, &auth.user_id).await?;
    Ok(Json(serde_json::json!(notifications)))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated =
        db::notifications::mark_read(&state.pool, &NotificationId(id), &auth.user_id).await?;
    if !updated {
        return Err(AppError::NotFound("notification not found".into()));
    }
    Ok(Json(serde_json::json!({ "read": true })))
}

#[derive(Deserialize)]
struct DeviceBody {
    device_token: String,
    channel_type: String,
}

async fn register_device(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<DeviceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !matches!(body.channel_type.as_str(), "APNS" | "GCM") {
        return Err(AppError::BadRequest(
            "channel_type must be APNS or GCM".into(),
        ));
    }
    if body.device_token.trim().is_empty() {
        return Err(AppError::BadRequest("device_token is required".into()));
    }
    db::notifications::upsert_device(
        &state.pool,
        &auth.user_id,
        body.device_token.trim(),
        &body.channel_type,
    )
    .await?;
    Ok(Json(serde_json::json!({ "registered": true })))
}

#[derive(Deserialize)]
struct UnregisterDeviceBody {
    device_token: String,
}

async fn unregister_device(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<UnregisterDeviceBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted =
        db::notifications::delete_device(&state.pool, &auth.user_id, &body.device_token).await?;
    if !deleted {
        return Err(AppError::NotFound("device not found".into()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn list_devices(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let devices = db::notifications::get_devices(&state.pool, &auth.user_id).await?;
    Ok(Json(serde_json::json!(devices)))
}
