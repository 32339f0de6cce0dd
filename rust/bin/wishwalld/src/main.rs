//! `wishwalld`: the wish-wall server binary.
//!
//! Usage:
//!   wishwalld -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/wishwall/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wish::WishModule;
use wish::service::WishConfig;
use wishwall_core::Module;

use config::ServerConfig;

/// Wish-wall server.
#[derive(Parser, Debug)]
#[command(name = "wishwalld", about = "Wish wall server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides `[server] listen`).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    let server_config = ServerConfig::load(&config_path)?;

    // Initialize logging. RUST_LOG overrides the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&server_config.log.filter)),
        )
        .init();
    info!("Loaded configuration from {}", config_path.display());

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = wishwall_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli
            .listen
            .clone()
            .unwrap_or_else(|| server_config.server.listen.clone()),
        ..Default::default()
    };

    let sqlite_path = core_config.resolve_sqlite_path();
    let sql: Arc<dyn wishwall_sql::SQLStore> = Arc::new(
        wishwall_sql::SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("SQL store opened at {}", sqlite_path.display());

    let moderator = bootstrap::build_moderator(&server_config.moderation);

    let wish_config = WishConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        token_ttl: server_config.jwt.expire_secs,
        app_state: server_config.app.state.clone(),
    };
    let wish_module = WishModule::new(sql, moderator, wish_config)?;
    info!("Wish module initialized");

    let module_routes = vec![(wish_module.name(), wish_module.routes())];
    let app = routes::build_router(&server_config.cors, module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("Wish wall server listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Wish wall server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
