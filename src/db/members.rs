use super::models::MemberRow;
use super::{Db, sql};
use crate::types::{StoryId, UserId};

#[tracing::instrument(skip(pool), err)]
pub async fn is_member(pool: &Db, story_id: &StoryId, user_id: &UserId) -> Result<bool, sqlx::Error> {
    let q = sql("SELECT 1 FROM story_users WHERE story_id = ? AND user_id = ?");
    let row: Option<(i32,)> = sqlx::query_as(&q)
        .bind(story_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// story_owners 行の有無が「管理できるか」の唯一の判定基準。
#[tracing::instrument(skip(pool), err)]
pub async fn is_owner(pool: &Db, story_id: &StoryId, user_id: &UserId) -> Result<bool, sqlx::Error> {
    let q = sql("SELECT 1 FROM story_owners WHERE story_id = ? AND user_id = ?");
    let row: Option<(i32,)> = sqlx::query_as(&q)
        .bind(story_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

#[tracing::instrument(skip(pool), err)]
pub async fn get_members(pool: &Db, story_id: &StoryId) -> Result<Vec<MemberRow>, sqlx::Error> {
    let q = sql(
        "SELECT su.id, su.user_id, su.role, p.name, p.last_name, p.image_url \
         FROM story_users su JOIN profiles p ON p.id = su.user_id \
         WHERE su.story_id = ? ORDER BY su.created_at ASC",
    );
    sqlx::query_as::<_, MemberRow>(&q)
        .bind(story_id.as_str())
        .fetch_all(pool)
        .await
}

/// Remove a membership row; any ownership row for the same user goes
/// with it so no orphaned owner records remain.
#[tracing::instrument(skip(pool), err)]
pub async fn remove_member(
    pool: &Db,
    story_id: &StoryId,
    member_row_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let q = sql("SELECT user_id FROM story_users WHERE id = ? AND story_id = ?");
    let row: Option<(String,)> = sqlx::query_as(&q)
        .bind(member_row_id)
        .bind(story_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
    let Some((user_id,)) = row else {
        return Ok(false);
    };

    let q = sql("DELETE FROM story_users WHERE id = ?");
    sqlx::query(&q).bind(member_row_id).execute(&mut *tx).await?;

    let q = sql("DELETE FROM story_owners WHERE story_id = ? AND user_id = ?");
    sqlx::query(&q)
        .bind(story_id.as_str())
        .bind(&user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

#[derive(Debug, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Joined; `as_owner` says whether the owner code was used.
    Joined { story_id: StoryId, as_owner: bool },
    UnknownCode,
    Locked,
    AlreadyMember,
}

/// Redeem an invite code for `user_id`.
///
/// ロック中のストーリーはどちらのコードでも参加不可で、一切の行を書かない。
/// オーナーコードなら story_users と story_owners の両方に行を入れる。
#[tracing::instrument(skip(pool, code), err)]
pub async fn redeem_invite(
    pool: &Db,
    code: &str,
    user_id: &UserId,
) -> Result<RedeemOutcome, sqlx::Error> {
    let Some(story) = super::stories::get_story_by_invite_code(pool, code).await? else {
        return Ok(RedeemOutcome::UnknownCode);
    };
    let story_id = StoryId(story.id.clone());

    if story.locked {
        return Ok(RedeemOutcome::Locked);
    }
    if is_member(pool, &story_id, user_id).await? {
        return Ok(RedeemOutcome::AlreadyMember);
    }

    let as_owner = story.invite_code_for_owner.as_deref() == Some(code);
    let role = if as_owner { "owner" } else { "member" };

    let mut tx = pool.begin().await?;

    let q = sql("INSERT INTO story_users (id, story_id, user_id, role) VALUES (?, ?, ?, ?)");
    sqlx::query(&q)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(story_id.as_str())
        .bind(user_id.as_str())
        .bind(role)
        .execute(&mut *tx)
        .await?;

    if as_owner {
        let q = sql("INSERT INTO story_owners (id, story_id, user_id) VALUES (?, ?, ?)");
        sqlx::query(&q)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(story_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(RedeemOutcome::Joined { story_id, as_owner })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_profile, test_pool};

    async fn seed(pool: &Db) -> (StoryId, UserId) {
        insert_profile(pool, "creator", "creator@example.com").await;
        insert_profile(pool, "joiner", "joiner@example.com").await;
        let story_id = StoryId::new_v4();
        crate::db::stories::create_story(pool, &story_id, "Test", None, &UserId("creator".into()))
            .await
            .unwrap();
        (story_id, UserId("joiner".into()))
    }

    async fn member_count(pool: &Db, story_id: &StoryId) -> usize {
        get_members(pool, story_id).await.unwrap().len()
    }

    #[tokio::test]
    async fn member_code_joins_without_ownership() {
        let pool = test_pool().await;
        let (story_id, joiner) = seed(&pool).await;
        let code = crate::db::stories::get_story(&pool, &story_id)
            .await
            .unwrap()
            .unwrap()
            .invite_code;

        let outcome = redeem_invite(&pool, &code, &joiner).await.unwrap();
        assert_eq!(
            outcome,
            RedeemOutcome::Joined {
                story_id: story_id.clone(),
                as_owner: false
            }
        );
        assert!(is_member(&pool, &story_id, &joiner).await.unwrap());
        assert!(!is_owner(&pool, &story_id, &joiner).await.unwrap());
    }

    #[tokio::test]
    async fn owner_code_writes_both_rows() {
        let pool = test_pool().await;
        let (story_id, joiner) = seed(&pool).await;
        let code = crate::db::stories::get_story(&pool, &story_id)
            .await
            .unwrap()
            .unwrap()
            .invite_code_for_owner
            .unwrap();

        let outcome = redeem_invite(&pool, &code, &joiner).await.unwrap();
        assert_eq!(
            outcome,
            RedeemOutcome::Joined {
                story_id: story_id.clone(),
                as_owner: true
            }
        );
        assert!(is_member(&pool, &story_id, &joiner).await.unwrap());
        assert!(is_owner(&pool, &story_id, &joiner).await.unwrap());
    }

    #[tokio::test]
    async fn locked_story_writes_nothing() {
        let pool = test_pool().await;
        let (story_id, joiner) = seed(&pool).await;
        let story = crate::db::stories::get_story(&pool, &story_id)
            .await
            .unwrap()
            .unwrap();
        crate::db::stories::update_story(&pool, &story_id, &story.title, None, true)
            .await
            .unwrap();
        let before = member_count(&pool, &story_id).await;

        let outcome = redeem_invite(&pool, &story.invite_code, &joiner)
            .await
            .unwrap();
        assert_eq!(outcome, RedeemOutcome::Locked);
        assert_eq!(member_count(&pool, &story_id).await, before);
        assert!(!is_member(&pool, &story_id, &joiner).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_and_duplicate_redemptions() {
        let pool = test_pool().await;
        let (story_id, joiner) = seed(&pool).await;
        let code = crate::db::stories::get_story(&pool, &story_id)
            .await
            .unwrap()
            .unwrap()
            .invite_code;

        assert_eq!(
            redeem_invite(&pool, "WRONG", &joiner).await.unwrap(),
            RedeemOutcome::UnknownCode
        );
        redeem_invite(&pool, &code, &joiner).await.unwrap();
        assert_eq!(
            redeem_invite(&pool, &code, &joiner).await.unwrap(),
            RedeemOutcome::AlreadyMember
        );
    }

    #[tokio::test]
    async fn removing_member_clears_ownership_too() {
        let pool = test_pool().await;
        let (story_id, joiner) = seed(&pool).await;
        let owner_code = crate::db::stories::get_story(&pool, &story_id)
            .await
            .unwrap()
            .unwrap()
            .invite_code_for_owner
            .unwrap();
        redeem_invite(&pool, &owner_code, &joiner).await.unwrap();

        let members = get_members(&pool, &story_id).await.unwrap();
        let row = members.iter().find(|m| m.user_id == "joiner").unwrap();
        assert!(remove_member(&pool, &story_id, &row.id).await.unwrap());
        assert!(!is_member(&pool, &story_id, &joiner).await.unwrap());
        assert!(!is_owner(&pool, &story_id, &joiner).await.unwrap());
    }
}
