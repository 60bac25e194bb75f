use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    /// アップロード済みメディアの公開URLのベース（末尾スラッシュなし）
    pub media_base_url: String,
    /// 生成される共有リンクのベース（末尾スラッシュなし）
    pub share_base_url: String,
    /// 1アップロードあたりのサイズ上限（MB）
    pub max_upload_megabytes: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:storyweave.db?mode=rwc".into()),
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "storyweave".into()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "auto".into()),
            media_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1/media".into()),
            share_base_url: env::var("SHARE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/share".into()),
            max_upload_megabytes: env::var("MAX_UPLOAD_MEGABYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}
