pub mod chapters;
pub mod media;
pub mod members;
pub mod models;
pub mod moments;
pub mod notifications;
pub mod profiles;
pub mod questions;
pub mod relationships;
pub mod reports;
pub mod sessions;
pub mod shared_urls;
pub mod stories;

#[cfg(not(feature = "postgres"))]
pub type Db = sqlx::SqlitePool;
#[cfg(feature = "postgres")]
pub type Db = sqlx::PgPool;

/// `?` プレースホルダを PostgreSQL の `$1, $2, ...` に変換する。
/// SQLite ビルドではそのまま返す。
#[cfg(not(feature = "postgres"))]
pub(crate) fn sql(query: &str) -> std::borrow::Cow<'_, str> {
    std::borrow::Cow::Borrowed(query)
}

#[cfg(feature = "postgres")]
pub(crate) fn sql(query: &str) -> std::borrow::Cow<'_, str> {
    use std::fmt::Write;
    let mut result = String::with_capacity(query.len() + 16);
    let mut idx = 0u32;
    let mut in_literal = false;
    for ch in query.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                result.push(ch);
            }
            '?' if !in_literal => {
                idx += 1;
                write!(result, "${idx}").unwrap();
            }
            _ => result.push(ch),
        }
    }
    std::borrow::Cow::Owned(result)
}

/// Comma-separated placeholder list for `IN (...)` clauses, to be run
/// through [`sql`] afterwards.
pub(crate) fn in_placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

pub async fn connect(url: &str) -> Result<Db, sqlx::Error> {
    #[cfg(not(feature = "postgres"))]
    {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(pool)
    }
    #[cfg(feature = "postgres")]
    {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(pool)
    }
}

pub async fn migrate(pool: &Db) -> Result<(), sqlx::migrate::MigrateError> {
    #[cfg(not(feature = "postgres"))]
    {
        sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    }
    #[cfg(feature = "postgres")]
    {
        sqlx::migrate!("./migrations/postgres").run(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Db;

    /// インメモリSQLiteに実マイグレーションを流したテスト用プール。
    /// 接続ごとに別のメモリDBになるため max_connections は 1 に固定する。
    pub(crate) async fn test_pool() -> Db {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        super::migrate(&pool).await.expect("migrations");
        pool
    }

    /// Shorthand profile fixture for db-level tests.
    pub(crate) async fn insert_profile(pool: &Db, id: &str, email: &str) {
        sqlx::query(
            "INSERT INTO profiles (id, email, password_hash, name) VALUES (?, ?, 'x', 'Test')",
        )
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .expect("insert profile");
    }
}

#[cfg(test)]
mod tests {
    use super::in_placeholders;

    #[test]
    fn placeholders_joined() {
        assert_eq!(in_placeholders(0), "");
        assert_eq!(in_placeholders(1), "?");
        assert_eq!(in_placeholders(3), "?, ?, ?");
    }
}
