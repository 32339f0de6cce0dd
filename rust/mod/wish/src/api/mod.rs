mod app;
mod interactions;
mod middleware;
mod users;
mod wishes;


use std::sync::Arc;

use axum::Router;
use tracing::error;

use wishwall_core::ServiceError;

use crate::service::{WishError, WishService};

/// Shared application state.
pub type AppState = Arc<WishService>;

/// Build the complete wish-wall API router, mounted under `/api`.
pub fn build_router(svc: Arc<WishService>) -> Router {
    let api = Router::new()
        .merge(users::routes())
        .merge(wishes::routes())
        .merge(interactions::routes())
        .merge(app::routes());

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::auth_middleware,
        ))
        .with_state(svc)
}

/// Run a service call on the blocking pool. Service methods do
/// synchronous SQLite and moderation I/O.
pub(crate) async fn run<T, F>(svc: &AppState, f: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&WishService) -> Result<T, WishError> + Send + 'static,
{
    let svc = svc.clone();
    tokio::task::spawn_blocking(move || f(&svc))
        .await
        .map_err(|e| {
            error!(error = %e, "service worker task failed");
            ServiceError::Internal("internal error".into())
        })?
        .map_err(ServiceError::from)
}
