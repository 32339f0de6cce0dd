use serde::{Deserialize, Serialize};

use crate::model::UserSummary;

/// A wish posted to the wall.
///
/// `like_count` and `comment_count` are denormalized counters. They are
/// only ever changed by relative updates inside the same transaction that
/// adds or removes the corresponding like/comment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wish {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub is_public: bool,
    pub background: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Input for posting a wish.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWish {
    pub content: String,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
