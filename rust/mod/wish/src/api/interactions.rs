use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use wishwall_core::ServiceError;

use crate::api::{AppState, run};
use crate::model::{Claims, Comment, CreateComment, Interactions, LikedState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wishes/{id}/like", post(toggle_like))
        .route("/wishes/{id}/comment", post(create_comment))
        .route("/wishes/{id}/interactions", get(interactions))
}

/// POST /api/wishes/{id}/like: flip the caller's like, reply `{"liked": bool}`.
async fn toggle_like(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<LikedState>, ServiceError> {
    Ok(Json(
        run(&svc, move |s| s.toggle_like(&id, &claims.sub)).await?,
    ))
}

async fn create_comment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ServiceError> {
    let comment = run(&svc, move |s| s.create_comment(&id, &claims.sub, input)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn interactions(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Interactions>, ServiceError> {
    Ok(Json(run(&svc, move |s| s.interactions(&id)).await?))
}
