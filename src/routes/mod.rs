mod auth;
mod chapter;
mod media;
mod moment;
mod notification;
mod profile;
mod question;
mod report;
mod story;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(profile::routes())
        .merge(story::routes())
        .merge(chapter::routes())
        .merge(moment::routes())
        .merge(question::routes())
        .merge(media::routes())
        .merge(notification::routes())
        .merge(report::routes());

    Router::new()
        .nest("/v1", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
