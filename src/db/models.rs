use serde::Serialize;

/// SQLite では TEXT として格納されるため String、
/// PostgreSQL では TIMESTAMPTZ として格納されるため chrono 型を使用。
#[cfg(not(feature = "postgres"))]
pub type Timestamp = String;
#[cfg(feature = "postgres")]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub last_name: String,
    pub bio: String,
    pub image_url: Option<String>,
    pub is_account_protected: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// プロフィールの公開部分のみ（他ユーザ向けのネスト表示に使う）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub last_name: String,
    pub image_url: Option<String>,
}

impl PublicProfile {
    /// Placeholder for a dangling reference (e.g. a relationship edge
    /// whose target profile has been deleted).
    pub fn missing(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            last_name: String::new(),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub token_hash: String,
    pub user_id: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoryRow {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub invite_code: String,
    pub invite_code_for_owner: Option<String>,
    pub locked: bool,
    pub user_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// story_users 行＋participantのプロフィール（JOINで取得）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberRow {
    pub id: String,
    pub user_id: String,
    pub role: String,
    pub name: String,
    pub last_name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChapterRow {
    pub id: String,
    pub title: String,
    pub order: i32,
    pub story_id: String,
    pub is_default: bool,
    pub image_url: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MomentRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub chapter_id: String,
    pub story_id: String,
    pub media_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MediaRow {
    pub id: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub is_video: bool,
    pub media_size_mega_bytes: f64,
    #[serde(skip_serializing)]
    pub s3_key: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub title: String,
    pub chapter_id: String,
    pub story_id: Option<String>,
    pub user_id: Option<String>,
    pub to_user_id: String,
    pub created_at: Timestamp,
}

/// 受信箱用: questions 行＋章・ストーリーのタイトル（JOINで取得）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QuestionInboxRow {
    pub id: String,
    pub title: String,
    pub chapter_id: String,
    pub chapter_title: String,
    pub story_title: String,
    pub user_id: Option<String>,
    pub to_user_id: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnswerRow {
    pub id: String,
    pub question_id: String,
    pub user_id: Option<String>,
    pub text: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RelationshipRow {
    pub id: String,
    pub user_id: String,
    pub with_user: String,
    pub relation: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub to_user_id: String,
    pub from_user_id: Option<String>,
    pub story_id: Option<String>,
    pub moment_id: Option<String>,
    pub title: String,
    pub message: String,
    pub redirect_url: Option<String>,
    pub is_read: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserDeviceRow {
    pub id: String,
    pub user_id: String,
    pub device_token: String,
    pub channel_type: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub reason: String,
    pub reported_content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SharedUrlRow {
    pub id: String,
    pub url: String,
    pub story_id: Option<String>,
    pub chapter_id: Option<String>,
    pub user_id: Option<String>,
    pub is_ready: bool,
    pub created_at: Timestamp,
}
