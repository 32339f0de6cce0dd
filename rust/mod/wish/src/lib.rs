//! Wish module: the wish-wall social backend.
//!
//! # Resources
//!
//! - **User**: account with argon2 password hash and a display profile
//! - **Wish**: short text post, public or private, optionally tagged
//! - **Like**: (wish, user) membership; `wishes.like_count` caches its size
//! - **Comment**: short reply under a wish
//!
//! # Usage
//!
//! ```ignore
//! use wish::{WishModule, service::WishConfig};
//!
//! let module = WishModule::new(sql, moderator, WishConfig::default())?;
//! let router = module.routes(); // serves /api/...
//! ```

pub mod model;
pub mod service;
pub mod api;

use std::sync::Arc;

use axum::Router;

use wishwall_core::{Module, ServiceError};
use wishwall_sql::SQLStore;

use crate::service::moderation::ContentModerator;
use crate::service::{WishConfig, WishService};

/// Wish module implementing the Module trait.
pub struct WishModule {
    service: Arc<WishService>,
}

impl WishModule {
    /// Create a new WishModule, initializing the schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        moderator: Arc<dyn ContentModerator>,
        config: WishConfig,
    ) -> Result<Self, ServiceError> {
        let service = WishService::new(sql, moderator, config).map_err(ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying WishService.
    pub fn service(&self) -> &Arc<WishService> {
        &self.service
    }
}

impl Module for WishModule {
    fn name(&self) -> &str {
        "wish"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
