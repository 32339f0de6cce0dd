use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use wishwall_core::ServiceError;

use crate::api::{AppState, run};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/app-state", get(app_state))
        .route("/test-ai", post(test_ai))
}

#[derive(Debug, Serialize)]
struct AppStateResponse {
    state: String,
    version: &'static str,
}

/// GET /api/app-state: lets clients show a maintenance banner.
async fn app_state(State(svc): State<AppState>) -> Json<AppStateResponse> {
    Json(AppStateResponse {
        state: svc.config().app_state.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
struct ProbeRequest {
    content: String,
}

#[derive(Debug, Serialize)]
struct ProbeResponse {
    violating: bool,
}

/// POST /api/test-ai: ask the moderator about a piece of text.
async fn test_ai(
    State(svc): State<AppState>,
    Json(input): Json<ProbeRequest>,
) -> Result<Json<ProbeResponse>, ServiceError> {
    let violating = run(&svc, move |s| s.probe_moderation(&input.content)).await?;
    Ok(Json(ProbeResponse { violating }))
}
