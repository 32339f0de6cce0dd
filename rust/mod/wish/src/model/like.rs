use serde::{Deserialize, Serialize};

/// Whether a like row exists for a (wish, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Liked,
    Unliked,
}

impl Membership {
    /// The state a toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            Membership::Liked => Membership::Unliked,
            Membership::Unliked => Membership::Liked,
        }
    }

    /// Counter delta that accompanies moving *into* this state.
    pub fn delta(self) -> i64 {
        match self {
            Membership::Liked => 1,
            Membership::Unliked => -1,
        }
    }
}

/// Result of a like toggle: the caller's membership after the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedState {
    pub liked: bool,
}

impl From<Membership> for LikedState {
    fn from(m: Membership) -> Self {
        LikedState {
            liked: m == Membership::Liked,
        }
    }
}

/// One entry of a wish's liker list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liker {
    pub user_id: String,
    pub nickname: String,
    pub avatar_id: i64,
    pub liked_at: String,
}
