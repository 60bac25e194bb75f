use super::models::ReportRow;
use super::{Db, sql};
use crate::types::{ReportId, UserId};

#[tracing::instrument(skip(pool, reported_content), err)]
pub async fn create_report(
    pool: &Db,
    id: &ReportId,
    user_id: &UserId,
    email: &str,
    name: Option<&str>,
    reason: &str,
    reported_content: &str,
) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO reports (id, user_id, email, name, reason, reported_content) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(user_id.as_str())
        .bind(email)
        .bind(name)
        .bind(reason)
        .bind(reported_content)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_all_reports(pool: &Db) -> Result<Vec<ReportRow>, sqlx::Error> {
    let q = sql("SELECT * FROM reports ORDER BY created_at DESC");
    sqlx::query_as::<_, ReportRow>(&q).fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    #[tokio::test]
    async fn reports_are_append_only_and_listed_newest_first() {
        let pool = test_pool().await;
        insert_profile(&pool, "u1", "u1@example.com").await;
        let user = UserId("u1".into());

        create_report(
            &pool,
            &ReportId::new_v4(),
            &user,
            "u1@example.com",
            None,
            "spam",
            "moment:abc",
        )
        .await
        .unwrap();

        let reports = get_all_reports(&pool).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reason, "spam");
    }
}
