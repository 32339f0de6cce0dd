use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use wishwall_core::ServiceError;

use crate::api::{AppState, run};
use crate::model::{AuthResponse, Claims, LoginRequest, RegisterRequest, UpdateUser, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/user/me", get(me))
        .route("/user", put(update_me))
}

/// POST /api/register
async fn register(
    State(svc): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServiceError> {
    let resp = run(&svc, move |s| s.register(input)).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /api/login
async fn login(
    State(svc): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServiceError> {
    Ok(Json(run(&svc, move |s| s.login(input)).await?))
}

/// GET /api/user/me: current user from the token subject.
async fn me(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ServiceError> {
    Ok(Json(run(&svc, move |s| s.get_user(&claims.sub)).await?))
}

/// PUT /api/user: update the caller's nickname / avatar.
async fn update_me(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(patch): Json<UpdateUser>,
) -> Result<Json<User>, ServiceError> {
    Ok(Json(run(&svc, move |s| s.update_user(&claims.sub, patch)).await?))
}
