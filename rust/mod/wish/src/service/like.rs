//! Like toggling.
//!
//! `wishes.like_count` caches `COUNT(*)` over `likes` for the same wish.
//! The cache stays exact because a like row and its counter delta are
//! always written in one transaction, the counter is only ever moved by
//! a relative `like_count + ?` update, and the `(wish_id, user_id)`
//! primary key turns a duplicate concurrent insert into a clean failure.

use tracing::{debug, info};

use wishwall_core::now_rfc3339;
use wishwall_sql::{SQLError, SQLExecutor, Value, in_transaction};

use crate::model::{LikedState, Membership};
use crate::service::{WishError, WishService};

/// What the write phase of a toggle ended up doing.
enum ToggleOutcome {
    /// Membership row changed and the counter moved with it.
    Applied(Membership),
    /// Another toggle for the same pair got there first; nothing written.
    Raced(Membership),
}

impl WishService {
    /// Flip `user_id`'s like on `wish_id` and return the resulting state.
    pub fn toggle_like(&self, wish_id: &str, user_id: &str) -> Result<LikedState, WishError> {
        let observed = self.observe_like(wish_id, user_id)?;
        self.apply_toggle(wish_id, user_id, observed)
    }

    /// Read phase: the wish must be live; membership comes from the store.
    pub fn observe_like(&self, wish_id: &str, user_id: &str) -> Result<Membership, WishError> {
        ensure_live_wish(self.sql.as_ref(), wish_id)?;
        membership(self.sql.as_ref(), wish_id, user_id)
    }

    /// Write phase: move away from `observed` in a single transaction.
    ///
    /// If the membership statement finds the pair already in the target
    /// state, the transaction commits nothing and that state is reported.
    pub fn apply_toggle(
        &self,
        wish_id: &str,
        user_id: &str,
        observed: Membership,
    ) -> Result<LikedState, WishError> {
        let target = observed.toggled();

        let outcome = in_transaction(self.sql.as_ref(), |tx| -> Result<_, WishError> {
            ensure_live_wish(tx, wish_id)?;

            let changed = match target {
                Membership::Liked => match tx.exec(
                    "INSERT INTO likes (wish_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    &[
                        Value::from(wish_id),
                        Value::from(user_id),
                        Value::Text(now_rfc3339()),
                    ],
                ) {
                    Ok(_) => true,
                    Err(SQLError::UniqueViolation(_)) => false,
                    Err(e) => return Err(WishError::from(e)),
                },
                Membership::Unliked => {
                    tx.exec(
                        "DELETE FROM likes WHERE wish_id = ?1 AND user_id = ?2",
                        &[Value::from(wish_id), Value::from(user_id)],
                    )? > 0
                }
            };

            if !changed {
                return Ok(ToggleOutcome::Raced(target));
            }

            let updated = tx.exec(
                "UPDATE wishes SET like_count = like_count + ?1 \
                 WHERE id = ?2 AND deleted_at IS NULL",
                &[Value::Integer(target.delta()), Value::from(wish_id)],
            )?;
            if updated == 0 {
                return Err(not_found(wish_id));
            }
            Ok(ToggleOutcome::Applied(target))
        })?;

        match outcome {
            ToggleOutcome::Applied(state) => {
                info!(wish_id, user_id, liked = state == Membership::Liked, "like toggled");
                Ok(state.into())
            }
            ToggleOutcome::Raced(state) => {
                debug!(wish_id, user_id, "like toggle lost a race, reporting current state");
                Ok(state.into())
            }
        }
    }

    /// Number of like rows currently recorded for a wish.
    pub fn count_like_records(&self, wish_id: &str) -> Result<i64, WishError> {
        count_likes(self.sql.as_ref(), wish_id)
    }

    /// Rebuild `like_count` from the likes relation. Returns the new count.
    pub fn recount_likes(&self, wish_id: &str) -> Result<i64, WishError> {
        in_transaction(self.sql.as_ref(), |tx| -> Result<i64, WishError> {
            ensure_live_wish(tx, wish_id)?;
            let count = count_likes(tx, wish_id)?;
            tx.exec(
                "UPDATE wishes SET like_count = ?1 WHERE id = ?2",
                &[Value::Integer(count), Value::from(wish_id)],
            )?;
            Ok(count)
        })
    }
}

fn not_found(wish_id: &str) -> WishError {
    WishError::NotFound(format!("wish '{wish_id}' not found"))
}

pub(crate) fn ensure_live_wish<S: SQLExecutor + ?Sized>(
    sql: &S,
    wish_id: &str,
) -> Result<(), WishError> {
    let rows = sql.query(
        "SELECT 1 AS hit FROM wishes WHERE id = ?1 AND deleted_at IS NULL",
        &[Value::from(wish_id)],
    )?;
    if rows.is_empty() {
        return Err(not_found(wish_id));
    }
    Ok(())
}

fn membership<S: SQLExecutor + ?Sized>(
    sql: &S,
    wish_id: &str,
    user_id: &str,
) -> Result<Membership, WishError> {
    let rows = sql.query(
        "SELECT 1 AS hit FROM likes WHERE wish_id = ?1 AND user_id = ?2",
        &[Value::from(wish_id), Value::from(user_id)],
    )?;
    Ok(if rows.is_empty() {
        Membership::Unliked
    } else {
        Membership::Liked
    })
}

fn count_likes<S: SQLExecutor + ?Sized>(sql: &S, wish_id: &str) -> Result<i64, WishError> {
    let rows = sql.query(
        "SELECT COUNT(*) AS cnt FROM likes WHERE wish_id = ?1",
        &[Value::from(wish_id)],
    )?;
    Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
}
