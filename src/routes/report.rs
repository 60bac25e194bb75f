use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::error::AppError;
use crate::types::ReportId;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/report", post(create_report))
        .route("/reports", get(list_reports))
}

#[derive(Deserialize)]
struct CreateReportBody {
    email: String,
    name: Option<String>,
    reason: String,
    reported_content: String,
}

async fn create_report(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(body): Json<CreateReportBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.reason.trim().is_empty() {
        return Err(AppError::BadRequest("reason is required".into()));
    }

    let id = ReportId::new_v4();
    db::reports::create_report(
        &state.pool,
        &id,
        &auth.user_id,
        &body.email,
        body.name.as_deref(),
        body.reason.trim(),
        &body.reported_content,
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// 通報一覧は運営（admin/moderator）のみ。
async fn list_reports(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let allowed = db::profiles::has_role(&state.pool, &auth.user_id, "admin").await?
        || db::profiles::has_role(&state.pool, &auth.user_id, "moderator").await?;
    if !allowed {
        return Err(AppError::Forbidden(
            "reports are visible to moderators only".into(),
        ));
    }

    let reports = db::reports::get_all_reports(&state.pool).await?;
    Ok(Json(serde_json::json!(reports)))
}
