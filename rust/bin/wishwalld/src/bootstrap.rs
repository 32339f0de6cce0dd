//! Startup checks and collaborator wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use wish::service::moderation::{
    AllowAllModerator, ContentModerator, DenyListModerator, HttpModerator, HttpModeratorConfig,
};

use crate::config::{ModerationConfig, ServerConfig};

/// Refuse to start on a config that cannot work.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.jwt.expire_secs <= 0 {
        anyhow::bail!("JWT expire_secs must be positive.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    let m = &config.moderation;
    if m.enabled && (m.endpoint.is_empty() || m.api_key.is_empty()) {
        anyhow::bail!("Moderation is enabled but endpoint or api_key is missing.");
    }
    Ok(())
}

/// Pick the moderator implementation for this deployment.
pub fn build_moderator(config: &ModerationConfig) -> Arc<dyn ContentModerator> {
    if config.enabled {
        info!(endpoint = %config.endpoint, model = %config.model, "content moderation enabled");
        return Arc::new(HttpModerator::new(HttpModeratorConfig {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }));
    }
    if !config.deny_words.is_empty() {
        info!(words = config.deny_words.len(), "content moderation using local deny list");
        return Arc::new(DenyListModerator::new(&config.deny_words));
    }
    warn!("content moderation disabled, all content is accepted");
    Arc::new(AllowAllModerator)
}
