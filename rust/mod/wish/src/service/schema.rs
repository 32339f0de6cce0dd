use wishwall_sql::SQLStore;

use crate::service::WishError;

/// Initialize the SQLite schema for all wish-wall resources.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), WishError> {
    let statements = [
        // Users table: credentials and profile
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            nickname TEXT NOT NULL,
            avatar_id INTEGER NOT NULL DEFAULT 0,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",

        // Wishes table: counters are denormalized caches of the
        // likes/comments relations and may never go negative.
        "CREATE TABLE IF NOT EXISTS wishes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            content TEXT NOT NULL,
            is_public INTEGER NOT NULL DEFAULT 1,
            background TEXT NOT NULL DEFAULT 'default',
            like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            comment_count INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
            created_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_wishes_public ON wishes(is_public, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_wishes_user ON wishes(user_id, created_at)",

        // Wish tags
        "CREATE TABLE IF NOT EXISTS wish_tags (
            wish_id TEXT NOT NULL,
            tag_name TEXT NOT NULL,
            PRIMARY KEY (wish_id, tag_name),
            FOREIGN KEY (wish_id) REFERENCES wishes(id) ON DELETE CASCADE
        )",

        // Likes: the composite key makes (wish, user) a set, so a second
        // concurrent insert for the same pair fails instead of duplicating.
        "CREATE TABLE IF NOT EXISTS likes (
            wish_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (wish_id, user_id),
            FOREIGN KEY (wish_id) REFERENCES wishes(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_likes_user ON likes(user_id)",

        // Comments
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            wish_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (wish_id) REFERENCES wishes(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_comments_wish ON comments(wish_id, created_at)",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])
            .map_err(|e| WishError::Storage(e.to_string()))?;
    }

    Ok(())
}
