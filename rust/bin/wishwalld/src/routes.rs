//! Route registration: module routes, system endpoints and the outer
//! HTTP layers (CORS, request tracing, panic recovery).

use axum::Router;
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::CorsConfig;

/// Build the complete router with all routes.
pub fn build_router(cors: &CorsConfig, module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    // Module routes carry absolute paths and their own state.
    for (name, router) in module_routes {
        info!(module = name, "module routes mounted");
        app = app.merge(router);
    }

    app.layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "wishwalld",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use wish::WishModule;
    use wish::service::WishConfig;
    use wish::service::moderation::AllowAllModerator;
    use wishwall_core::Module;
    use wishwall_sql::{SQLStore, SqliteStore};

    use super::*;

    fn app(cors: CorsConfig) -> Router {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let module =
            WishModule::new(sql, Arc::new(AllowAllModerator), WishConfig::default()).unwrap();
        build_router(&cors, vec![(module.name(), module.routes())])
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn system_endpoints() {
        let r = app(CorsConfig::default());
        let (status, body) = get_json(&r, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(&r, "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "wishwalld");
    }

    #[tokio::test]
    async fn module_routes_are_mounted() {
        let r = app(CorsConfig::default());
        let (status, body) = get_json(&r, "/api/wishes/public").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, body) = get_json(&r, "/api/user/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let r = app(CorsConfig {
            allowed_origins: vec!["https://wall.example.com".into()],
        });
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/wishes")
            .header("origin", "https://wall.example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = r.clone().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "https://wall.example.com"
        );

        let req = Request::builder()
            .uri("/health")
            .header("origin", "https://evil.example.com")
            .body(Body::empty())
            .unwrap();
        let resp = r.oneshot(req).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }
}
