pub mod schema;
pub mod token;
pub mod moderation;
pub mod user;
pub mod wish;
pub mod like;
pub mod comment;

use std::sync::Arc;

use thiserror::Error;

use wishwall_sql::{Row, SQLError, SQLStore};

use crate::model::UserSummary;
use crate::service::moderation::ContentModerator;
use crate::service::token::JwtService;

/// Wish service error type.
#[derive(Debug, Error)]
pub enum WishError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("content rejected: {0}")]
    ContentRejected(String),

    #[error("upstream: {0}")]
    Upstream(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SQLError> for WishError {
    fn from(e: SQLError) -> Self {
        match e {
            SQLError::UniqueViolation(m) => WishError::Conflict(m),
            other => WishError::Storage(other.to_string()),
        }
    }
}

impl From<WishError> for wishwall_core::ServiceError {
    fn from(e: WishError) -> Self {
        use wishwall_core::ServiceError;
        match e {
            WishError::NotFound(m) => ServiceError::NotFound(m),
            WishError::Conflict(m) => ServiceError::Conflict(m),
            WishError::Validation(m) => ServiceError::Validation(m),
            WishError::Unauthorized(m) => ServiceError::Unauthorized(m),
            WishError::Forbidden(m) => ServiceError::PermissionDenied(m),
            WishError::ContentRejected(m) => ServiceError::ContentRejected(m),
            WishError::Upstream(m) => ServiceError::Upstream(m),
            WishError::Storage(m) => ServiceError::Storage(m),
            WishError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

/// Configuration for the wish service.
#[derive(Debug, Clone)]
pub struct WishConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 7 days).
    pub token_ttl: i64,
    /// Value reported by `GET /api/app-state`.
    pub app_state: String,
}

impl Default for WishConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "wishwall-dev-secret-change-me".to_string(),
            token_ttl: 604800,
            app_state: "open".to_string(),
        }
    }
}

/// The wish-wall service. Holds the store, the moderation client and the
/// token signer. Stateless otherwise: every piece of shared state lives
/// in the SQL store.
pub struct WishService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) moderator: Arc<dyn ContentModerator>,
    pub(crate) jwt: JwtService,
    pub(crate) config: WishConfig,
}

impl WishService {
    /// Create a new WishService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        moderator: Arc<dyn ContentModerator>,
        config: WishConfig,
    ) -> Result<Arc<Self>, WishError> {
        schema::init_schema(sql.as_ref())?;
        let jwt = JwtService::new(&config.jwt_secret, config.token_ttl);
        Ok(Arc::new(Self {
            sql,
            moderator,
            jwt,
            config,
        }))
    }

    pub fn config(&self) -> &WishConfig {
        &self.config
    }

    /// Run content through the moderation collaborator.
    ///
    /// Violating content becomes `ContentRejected`; a moderator failure is
    /// passed through as `Upstream` so the caller can retry later.
    pub(crate) fn moderate(&self, content: &str) -> Result<(), WishError> {
        if self.moderator.check(content)? {
            return Err(WishError::ContentRejected(
                "content contains inappropriate material".into(),
            ));
        }
        Ok(())
    }

    /// Ask the moderator about `content` without acting on the verdict.
    pub fn probe_moderation(&self, content: &str) -> Result<bool, WishError> {
        if content.trim().is_empty() {
            return Err(WishError::Validation("content must not be empty".into()));
        }
        self.moderator.check(content)
    }
}

/// Trim and bound user-supplied text.
pub(crate) fn clean_text(raw: &str, what: &str, max_chars: usize) -> Result<String, WishError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(WishError::Validation(format!("{what} must not be empty")));
    }
    if text.chars().count() > max_chars {
        return Err(WishError::Validation(format!(
            "{what} must be at most {max_chars} characters"
        )));
    }
    Ok(text.to_string())
}

/// Read the `author_*` columns joined onto wish and comment queries.
pub(crate) fn author_from_row(row: &Row) -> Option<UserSummary> {
    let id = row.get_str("author_id")?;
    Some(UserSummary {
        id: id.to_string(),
        username: row.get_opt_str("author_username").unwrap_or_default(),
        nickname: row.get_opt_str("author_nickname").unwrap_or_default(),
        avatar_id: row.get_i64("author_avatar_id").unwrap_or(0),
    })
}

pub(crate) fn required_str(row: &Row, col: &str) -> Result<String, WishError> {
    row.get_opt_str(col)
        .ok_or_else(|| WishError::Internal(format!("missing {col} column")))
}
