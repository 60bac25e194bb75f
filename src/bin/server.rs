use std::sync::Arc;

use storyweave_api::AppState;
use storyweave_api::config::AppConfig;
use storyweave_api::db;
use storyweave_api::routes::build_router;
use storyweave_api::storage::S3Storage;
use tokio::time::{Duration, sleep};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyweave_api=debug,tower_http=debug".parse().unwrap()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("starting server on {}", config.listen_addr);

    let pool = db::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    db::migrate(&pool).await.expect("failed to run migrations");

    {
        let sweep_pool = pool.clone();
        tokio::spawn(async move {
            loop {
                match db::sessions::delete_expired_sessions(&sweep_pool).await {
                    Ok(deleted) => {
                        tracing::info!(deleted, "session sweep finished");
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "session sweep failed"
                        );
                    }
                }
                sleep(SESSION_SWEEP_INTERVAL).await;
            }
        });
    }

    let storage = Arc::new(S3Storage::new(&config).await);

    let state = AppState {
        pool,
        config: config.clone(),
        storage,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind");
    tracing::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app).await.expect("server error");
}
