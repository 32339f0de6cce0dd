use tracing::info;

use wishwall_core::{new_id, now_rfc3339};
use wishwall_sql::{Value, in_transaction};

use crate::model::{Comment, CreateComment, Interactions, Liker, UserSummary};
use crate::service::like::ensure_live_wish;
use crate::service::{WishError, WishService, author_from_row, clean_text, required_str};

pub(crate) const MAX_COMMENT_CHARS: usize = 200;

impl WishService {
    /// Comment on a live wish. The comment row and the counter bump share
    /// one transaction.
    pub fn create_comment(
        &self,
        wish_id: &str,
        user_id: &str,
        input: CreateComment,
    ) -> Result<Comment, WishError> {
        ensure_live_wish(self.sql.as_ref(), wish_id)?;
        let content = clean_text(&input.content, "comment", MAX_COMMENT_CHARS)?;
        self.moderate(&content)?;

        let id = new_id();
        let now = now_rfc3339();

        in_transaction(self.sql.as_ref(), |tx| -> Result<(), WishError> {
            let updated = tx.exec(
                "UPDATE wishes SET comment_count = comment_count + 1 \
                 WHERE id = ?1 AND deleted_at IS NULL",
                &[Value::from(wish_id)],
            )?;
            if updated == 0 {
                return Err(WishError::NotFound(format!("wish '{wish_id}' not found")));
            }
            tx.exec(
                "INSERT INTO comments (id, wish_id, user_id, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::from(id.as_str()),
                    Value::from(wish_id),
                    Value::from(user_id),
                    Value::from(content.as_str()),
                    Value::from(now.as_str()),
                ],
            )?;
            Ok(())
        })?;

        info!(wish_id, user_id, comment_id = %id, "comment created");

        let user = self.get_user(user_id).ok().map(UserSummary::from);
        Ok(Comment {
            id,
            wish_id: wish_id.to_string(),
            user_id: user_id.to_string(),
            content,
            created_at: now,
            user,
        })
    }

    /// Comments (newest first) and likers of a live wish.
    pub fn interactions(&self, wish_id: &str) -> Result<Interactions, WishError> {
        let counters = self.sql.query(
            "SELECT like_count, comment_count FROM wishes WHERE id = ?1 AND deleted_at IS NULL",
            &[Value::from(wish_id)],
        )?;
        let counters = counters
            .first()
            .ok_or_else(|| WishError::NotFound(format!("wish '{wish_id}' not found")))?;

        let comment_rows = self.sql.query(
            "SELECT c.id, c.wish_id, c.user_id, c.content, c.created_at, \
             u.id AS author_id, u.username AS author_username, \
             u.nickname AS author_nickname, u.avatar_id AS author_avatar_id \
             FROM comments c LEFT JOIN users u ON u.id = c.user_id \
             WHERE c.wish_id = ?1 ORDER BY c.created_at DESC, c.rowid DESC",
            &[Value::from(wish_id)],
        )?;
        let comments = comment_rows
            .iter()
            .map(|row| {
                Ok(Comment {
                    id: required_str(row, "id")?,
                    wish_id: required_str(row, "wish_id")?,
                    user_id: required_str(row, "user_id")?,
                    content: required_str(row, "content")?,
                    created_at: required_str(row, "created_at")?,
                    user: author_from_row(row),
                })
            })
            .collect::<Result<Vec<_>, WishError>>()?;

        let like_rows = self.sql.query(
            "SELECT l.user_id, l.created_at, u.nickname, u.avatar_id \
             FROM likes l LEFT JOIN users u ON u.id = l.user_id \
             WHERE l.wish_id = ?1 ORDER BY l.created_at DESC, l.rowid DESC",
            &[Value::from(wish_id)],
        )?;
        let likes = like_rows
            .iter()
            .map(|row| {
                Ok(Liker {
                    user_id: required_str(row, "user_id")?,
                    nickname: row.get_opt_str("nickname").unwrap_or_default(),
                    avatar_id: row.get_i64("avatar_id").unwrap_or(0),
                    liked_at: required_str(row, "created_at")?,
                })
            })
            .collect::<Result<Vec<_>, WishError>>()?;

        Ok(Interactions {
            wish_id: wish_id.to_string(),
            like_count: counters.get_i64("like_count").unwrap_or(0),
            comment_count: counters.get_i64("comment_count").unwrap_or(0),
            comments,
            likes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::CreateComment;
    use crate::service::WishError;
    use crate::service::moderation::DenyListModerator;
    use crate::service::testutil::{seed_user, seed_wish, service_with, test_service};

    fn comment(content: &str) -> CreateComment {
        CreateComment {
            content: content.into(),
        }
    }

    #[test]
    fn comments_bump_counter_and_list_newest_first() {
        let svc = test_service();
        seed_user(&svc, "owner");
        seed_user(&svc, "u1");
        seed_wish(&svc, "w1", "owner");

        let first = svc.create_comment("w1", "u1", comment(" hope it comes true ")).unwrap();
        assert_eq!(first.content, "hope it comes true");
        assert_eq!(first.user.as_ref().unwrap().nickname, "Nick u1");
        svc.create_comment("w1", "owner", comment("thanks!")).unwrap();
        svc.toggle_like("w1", "u1").unwrap();

        let view = svc.interactions("w1").unwrap();
        assert_eq!(view.comment_count, 2);
        assert_eq!(view.like_count, 1);
        assert_eq!(view.comments.len(), 2);
        assert_eq!(view.comments[0].content, "thanks!");
        assert_eq!(view.comments[1].id, first.id);
        assert_eq!(view.likes.len(), 1);
        assert_eq!(view.likes[0].user_id, "u1");
        assert_eq!(view.likes[0].nickname, "Nick u1");
    }

    #[test]
    fn comment_validation_and_missing_wish() {
        let svc = test_service();
        seed_user(&svc, "owner");
        seed_wish(&svc, "w1", "owner");

        assert!(matches!(
            svc.create_comment("w1", "owner", comment("  ")),
            Err(WishError::Validation(_))
        ));
        assert!(matches!(
            svc.create_comment("w1", "owner", comment(&"y".repeat(201))),
            Err(WishError::Validation(_))
        ));
        assert!(matches!(
            svc.create_comment("nope", "owner", comment("hi")),
            Err(WishError::NotFound(_))
        ));
        assert!(matches!(svc.interactions("nope"), Err(WishError::NotFound(_))));
        assert_eq!(svc.interactions("w1").unwrap().comment_count, 0);
    }

    #[test]
    fn rejected_comment_leaves_counter_alone() {
        let svc = service_with(Arc::new(DenyListModerator::new(["scam"])));
        seed_user(&svc, "owner");
        seed_wish(&svc, "w1", "owner");

        assert!(matches!(
            svc.create_comment("w1", "owner", comment("join this SCAM")),
            Err(WishError::ContentRejected(_))
        ));
        let view = svc.interactions("w1").unwrap();
        assert_eq!(view.comment_count, 0);
        assert!(view.comments.is_empty());
    }
}
