//! Server-side configuration, read from a TOML file.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//!
//! [storage]
//! data_dir = "/var/lib/wishwall"
//!
//! [jwt]
//! secret = "..."
//! expire_secs = 604800
//!
//! [moderation]
//! enabled = true
//! endpoint = "https://api.example.com/v1/chat/completions"
//! api_key = "..."
//! model = "gpt-4o-mini"
//! timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory searched for named configs (`-c prod` → `/etc/wishwall/prod.toml`).
const CONFIG_DIR: &str = "/etc/wishwall";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expire_secs: default_expire_secs(),
        }
    }
}

fn default_expire_secs() -> i64 {
    7 * 24 * 3600
}

/// External content moderation. Disabled means every text is accepted,
/// except for words in `deny_words`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub deny_words: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            deny_words: Vec::new(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Allowed browser origins. Empty or `["*"]` allows any origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reported by `GET /api/app-state`, e.g. "open" or "maintenance".
    #[serde(default = "default_app_state")]
    pub state: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state: default_app_state(),
        }
    }
}

fn default_app_state() -> String {
    "open".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins if set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info,tower_http=debug".to_string()
}

impl ServerConfig {
    /// Resolve `-c` to a file: anything that looks like a path is used
    /// as-is, a bare name maps to `/etc/wishwall/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(CONFIG_DIR).join(format!("{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_named_and_explicit_paths() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/wishwall/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = ServerConfig::parse(
            r#"
            [storage]
            data_dir = "/tmp/wall"

            [jwt]
            secret = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.jwt.expire_secs, 604800);
        assert!(!config.moderation.enabled);
        assert_eq!(config.moderation.timeout_secs, 10);
        assert!(config.cors.allowed_origins.is_empty());
        assert_eq!(config.app.state, "open");
    }

    #[test]
    fn full_config() {
        let config = ServerConfig::parse(
            r#"
            [server]
            listen = "127.0.0.1:9000"

            [storage]
            data_dir = "/data"

            [jwt]
            secret = "k"
            expire_secs = 60

            [moderation]
            enabled = true
            endpoint = "http://moderator.local/v1/chat/completions"
            api_key = "key"
            model = "guard-1"
            timeout_secs = 3
            deny_words = ["spam"]

            [cors]
            allowed_origins = ["https://wall.example.com"]

            [app]
            state = "maintenance"

            [log]
            filter = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.jwt.expire_secs, 60);
        assert_eq!(config.moderation.model, "guard-1");
        assert_eq!(config.moderation.deny_words, vec!["spam"]);
        assert_eq!(config.cors.allowed_origins.len(), 1);
        assert_eq!(config.app.state, "maintenance");
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn missing_required_section_fails() {
        assert!(ServerConfig::parse("[storage]\ndata_dir = \"/d\"\n").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.toml");
        std::fs::write(&path, "[storage]\ndata_dir = \"/d\"\n[jwt]\nsecret = \"x\"\n").unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.storage.data_dir, "/d");
        assert!(ServerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
