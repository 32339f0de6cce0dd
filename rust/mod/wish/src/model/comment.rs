use serde::{Deserialize, Serialize};

use crate::model::{Liker, UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub wish_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

/// Everything shown under a wish: comments and who liked it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactions {
    pub wish_id: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub comments: Vec<Comment>,
    pub likes: Vec<Liker>,
}
