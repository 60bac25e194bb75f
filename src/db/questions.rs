use super::models::{AnswerRow, QuestionInboxRow, QuestionRow};
use super::{Db, in_placeholders, sql};
use crate::types::{AnswerId, ChapterId, QuestionId, StoryId, UserId};

#[tracing::instrument(skip(pool), err)]
pub async fn create_question(
    pool: &Db,
    id: &QuestionId,
    chapter_id: &ChapterId,
    story_id: &StoryId,
    title: &str,
    asked_by: &UserId,
    to_user: &UserId,
) -> Result<(), sqlx::Error> {
    let q = sql(
        "INSERT INTO questions (id, title, chapter_id, story_id, user_id, to_user_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(title)
        .bind(chapter_id.as_str())
        .bind(story_id.as_str())
        .bind(asked_by.as_str())
        .bind(to_user.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_question(pool: &Db, id: &QuestionId) -> Result<Option<QuestionRow>, sqlx::Error> {
    let q = sql("SELECT * FROM questions WHERE id = ?");
    sqlx::query_as::<_, QuestionRow>(&q)
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_questions_by_chapter(
    pool: &Db,
    chapter_id: &ChapterId,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    let q = sql("SELECT * FROM questions WHERE chapter_id = ? ORDER BY created_at ASC");
    sqlx::query_as::<_, QuestionRow>(&q)
        .bind(chapter_id.as_str())
        .fetch_all(pool)
        .await
}

/// 受信箱: 自分宛ての質問を章・ストーリーのタイトル付きで返す。
#[tracing::instrument(skip(pool), err)]
pub async fn get_inbox(pool: &Db, to_user: &UserId) -> Result<Vec<QuestionInboxRow>, sqlx::Error> {
    let q = sql(
        "SELECT q.id, q.title, q.chapter_id, c.title AS chapter_title, s.title AS story_title, \
         q.user_id, q.to_user_id, q.created_at \
         FROM questions q \
         JOIN chapters c ON c.id = q.chapter_id \
         JOIN stories s ON s.id = c.story_id \
         WHERE q.to_user_id = ? ORDER BY q.created_at DESC",
    );
    sqlx::query_as::<_, QuestionInboxRow>(&q)
        .bind(to_user.as_str())
        .fetch_all(pool)
        .await
}

/// Callers must have trimmed and rejected blank text already; this is
/// the plain insert.
#[tracing::instrument(skip(pool), err)]
pub async fn create_answer(
    pool: &Db,
    id: &AnswerId,
    question_id: &QuestionId,
    user_id: &UserId,
    text: &str,
) -> Result<(), sqlx::Error> {
    let q = sql("INSERT INTO answers (id, question_id, user_id, text) VALUES (?, ?, ?, ?)");
    sqlx::query(&q)
        .bind(id.as_str())
        .bind(question_id.as_str())
        .bind(user_id.as_str())
        .bind(text)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_answers(
    pool: &Db,
    question_id: &QuestionId,
) -> Result<Vec<AnswerRow>, sqlx::Error> {
    let q = sql("SELECT * FROM answers WHERE question_id = ? ORDER BY created_at ASC");
    sqlx::query_as::<_, AnswerRow>(&q)
        .bind(question_id.as_str())
        .fetch_all(pool)
        .await
}

/// 複数質問の回答を1クエリで取得（受信箱・章ビューのバッチ用）
#[tracing::instrument(skip(pool, question_ids), err)]
pub async fn get_answers_for_questions(
    pool: &Db,
    question_ids: &[String],
) -> Result<Vec<AnswerRow>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }
    let stmt = format!(
        "SELECT * FROM answers WHERE question_id IN ({}) ORDER BY created_at ASC",
        in_placeholders(question_ids.len())
    );
    let q = sql(&stmt);
    let mut query = sqlx::query_as::<_, AnswerRow>(&q);
    for id in question_ids {
        query = query.bind(id);
    }
    query.fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    async fn seed(pool: &Db) -> (StoryId, ChapterId, UserId, UserId) {
        insert_profile(pool, "asker", "asker@example.com").await;
        insert_profile(pool, "target", "target@example.com").await;
        let story_id = StoryId::new_v4();
        let asker = UserId("asker".into());
        crate::db::stories::create_story(pool, &story_id, "Story", None, &asker)
            .await
            .unwrap();
        let chapters = crate::db::chapters::get_chapters_by_story(pool, &story_id)
            .await
            .unwrap();
        (
            story_id,
            ChapterId(chapters[0].id.clone()),
            asker,
            UserId("target".into()),
        )
    }

    #[tokio::test]
    async fn answered_iff_answer_rows_exist() {
        let pool = test_pool().await;
        let (story_id, chapter_id, asker, target) = seed(&pool).await;

        let question_id = QuestionId::new_v4();
        create_question(&pool, &question_id, &chapter_id, &story_id, "Where?", &asker, &target)
            .await
            .unwrap();
        assert!(get_answers(&pool, &question_id).await.unwrap().is_empty());

        // read-after-write: 挿入直後から「回答済み」に分類される
        create_answer(&pool, &AnswerId::new_v4(), &question_id, &target, "Yes")
            .await
            .unwrap();
        let answers = get_answers(&pool, &question_id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "Yes");
    }

    #[tokio::test]
    async fn answers_accumulate_without_uniqueness() {
        let pool = test_pool().await;
        let (story_id, chapter_id, asker, target) = seed(&pool).await;

        let question_id = QuestionId::new_v4();
        create_question(&pool, &question_id, &chapter_id, &story_id, "Q", &asker, &target)
            .await
            .unwrap();
        create_answer(&pool, &AnswerId::new_v4(), &question_id, &target, "first")
            .await
            .unwrap();
        create_answer(&pool, &AnswerId::new_v4(), &question_id, &target, "second")
            .await
            .unwrap();

        assert_eq!(get_answers(&pool, &question_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn inbox_carries_chapter_and_story_titles() {
        let pool = test_pool().await;
        let (story_id, chapter_id, asker, target) = seed(&pool).await;

        create_question(
            &pool,
            &QuestionId::new_v4(),
            &chapter_id,
            &story_id,
            "For you",
            &asker,
            &target,
        )
        .await
        .unwrap();

        let inbox = get_inbox(&pool, &target).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, "For you");
        assert_eq!(inbox[0].story_title, "Story");
        assert!(get_inbox(&pool, &asker).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batched_answer_fetch_spans_questions() {
        let pool = test_pool().await;
        let (story_id, chapter_id, asker, target) = seed(&pool).await;

        let q1 = QuestionId::new_v4();
        let q2 = QuestionId::new_v4();
        create_question(&pool, &q1, &chapter_id, &story_id, "Q1", &asker, &target)
            .await
            .unwrap();
        create_question(&pool, &q2, &chapter_id, &story_id, "Q2", &asker, &target)
            .await
            .unwrap();
        create_answer(&pool, &AnswerId::new_v4(), &q2, &target, "only q2")
            .await
            .unwrap();

        let all = get_answers_for_questions(&pool, &[q1.0.clone(), q2.0.clone()])
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].question_id, q2.0);
    }
}
