use std::collections::HashMap;

use tracing::info;

use wishwall_core::{ListResult, PageParams, new_id, now_rfc3339};
use wishwall_sql::{Row, Value, in_transaction};

use crate::model::{CreateWish, Wish};
use crate::service::{WishError, WishService, author_from_row, clean_text, required_str};

pub(crate) const MAX_WISH_CHARS: usize = 500;
const MAX_TAG_CHARS: usize = 32;
const MAX_BACKGROUND_CHARS: usize = 64;

const WISH_SELECT: &str = "SELECT w.id, w.user_id, w.content, w.is_public, w.background, \
     w.like_count, w.comment_count, w.created_at, \
     u.id AS author_id, u.username AS author_username, \
     u.nickname AS author_nickname, u.avatar_id AS author_avatar_id \
     FROM wishes w LEFT JOIN users u ON u.id = w.user_id";

impl WishService {
    /// Post a wish. Content is moderated before anything is written.
    pub fn create_wish(&self, user_id: &str, input: CreateWish) -> Result<Wish, WishError> {
        let content = clean_text(&input.content, "content", MAX_WISH_CHARS)?;
        let background = match input.background.as_deref().map(str::trim) {
            Some(bg) if !bg.is_empty() => clean_text(bg, "background", MAX_BACKGROUND_CHARS)?,
            _ => "default".to_string(),
        };
        let tags = normalize_tags(&input.tags)?;

        self.moderate(&content)?;

        let id = new_id();
        let is_public = input.is_public.unwrap_or(true);
        let now = now_rfc3339();

        in_transaction(self.sql.as_ref(), |tx| -> Result<(), WishError> {
            tx.exec(
                "INSERT INTO wishes (id, user_id, content, is_public, background, \
                 like_count, comment_count, created_at) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
                &[
                    Value::from(id.as_str()),
                    Value::from(user_id),
                    Value::from(content.as_str()),
                    Value::Integer(is_public as i64),
                    Value::from(background.as_str()),
                    Value::from(now.as_str()),
                ],
            )?;
            for tag in &tags {
                tx.exec(
                    "INSERT INTO wish_tags (wish_id, tag_name) VALUES (?1, ?2)",
                    &[Value::from(id.as_str()), Value::from(tag.as_str())],
                )?;
            }
            Ok(())
        })?;

        info!(wish_id = %id, user_id, is_public, tags = tags.len(), "wish created");
        self.get_wish(&id)
    }

    /// Get a live wish with its author and tags.
    pub fn get_wish(&self, id: &str) -> Result<Wish, WishError> {
        let rows = self.sql.query(
            &format!("{WISH_SELECT} WHERE w.id = ?1 AND w.deleted_at IS NULL"),
            &[Value::from(id)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| WishError::NotFound(format!("wish '{id}' not found")))?;
        let mut wish = row_to_wish(row)?;
        wish.tags = self.load_tags(&[id.to_string()])?.remove(id).unwrap_or_default();
        Ok(wish)
    }

    /// Public feed, newest first.
    pub fn list_public(&self, params: &PageParams) -> Result<ListResult<Wish>, WishError> {
        self.list_where("w.is_public = 1", &[], params)
    }

    /// The caller's own wishes (public and private), newest first.
    pub fn list_mine(
        &self,
        user_id: &str,
        params: &PageParams,
    ) -> Result<ListResult<Wish>, WishError> {
        self.list_where("w.user_id = ?1", &[Value::from(user_id)], params)
    }

    /// Soft-delete a wish. Only its owner may do this.
    pub fn delete_wish(&self, id: &str, user_id: &str) -> Result<(), WishError> {
        let rows = self.sql.query(
            "SELECT user_id FROM wishes WHERE id = ?1 AND deleted_at IS NULL",
            &[Value::from(id)],
        )?;
        let owner = rows
            .first()
            .and_then(|r| r.get_opt_str("user_id"))
            .ok_or_else(|| WishError::NotFound(format!("wish '{id}' not found")))?;
        if owner != user_id {
            return Err(WishError::Forbidden("only the author can delete this wish".into()));
        }

        let affected = self.sql.exec(
            "UPDATE wishes SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            &[Value::Text(now_rfc3339()), Value::from(id)],
        )?;
        if affected == 0 {
            return Err(WishError::NotFound(format!("wish '{id}' not found")));
        }
        info!(wish_id = id, user_id, "wish deleted");
        Ok(())
    }

    fn list_where(
        &self,
        filter: &str,
        filter_params: &[Value],
        params: &PageParams,
    ) -> Result<ListResult<Wish>, WishError> {
        let count_rows = self.sql.query(
            &format!(
                "SELECT COUNT(*) AS cnt FROM wishes w WHERE {filter} AND w.deleted_at IS NULL"
            ),
            filter_params,
        )?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let n = filter_params.len();
        let mut query_params = filter_params.to_vec();
        query_params.push(Value::Integer(params.page_size() as i64));
        query_params.push(Value::Integer(params.offset()));
        let rows = self.sql.query(
            &format!(
                "{WISH_SELECT} WHERE {filter} AND w.deleted_at IS NULL \
                 ORDER BY w.created_at DESC, w.rowid DESC LIMIT ?{} OFFSET ?{}",
                n + 1,
                n + 2
            ),
            &query_params,
        )?;

        let mut items = rows.iter().map(row_to_wish).collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<String> = items.iter().map(|w| w.id.clone()).collect();
        let mut tags = self.load_tags(&ids)?;
        for wish in &mut items {
            wish.tags = tags.remove(&wish.id).unwrap_or_default();
        }

        Ok(ListResult {
            items,
            total,
            page: params.page(),
        })
    }

    /// Tags for a batch of wishes, in insertion order.
    fn load_tags(&self, wish_ids: &[String]) -> Result<HashMap<String, Vec<String>>, WishError> {
        let mut out: HashMap<String, Vec<String>> = HashMap::new();
        if wish_ids.is_empty() {
            return Ok(out);
        }
        let placeholders = (1..=wish_ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let params: Vec<Value> = wish_ids.iter().map(|id| Value::from(id.as_str())).collect();
        let rows = self.sql.query(
            &format!(
                "SELECT wish_id, tag_name FROM wish_tags WHERE wish_id IN ({placeholders}) \
                 ORDER BY rowid"
            ),
            &params,
        )?;
        for row in &rows {
            out.entry(required_str(row, "wish_id")?)
                .or_default()
                .push(required_str(row, "tag_name")?);
        }
        Ok(out)
    }
}

/// Trim tags, drop empty ones and collapse duplicates (first one wins).
fn normalize_tags(raw: &[String]) -> Result<Vec<String>, WishError> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(WishError::Validation(format!(
                "tag must be at most {MAX_TAG_CHARS} characters"
            )));
        }
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    Ok(tags)
}

fn row_to_wish(row: &Row) -> Result<Wish, WishError> {
    Ok(Wish {
        id: required_str(row, "id")?,
        user_id: required_str(row, "user_id")?,
        content: required_str(row, "content")?,
        is_public: row.get_i64("is_public").unwrap_or(1) != 0,
        background: required_str(row, "background")?,
        like_count: row.get_i64("like_count").unwrap_or(0),
        comment_count: row.get_i64("comment_count").unwrap_or(0),
        created_at: required_str(row, "created_at")?,
        user: author_from_row(row),
        tags: Vec::new(),
    })
}
