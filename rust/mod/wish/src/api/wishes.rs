use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use wishwall_core::{ListResult, PageParams, ServiceError};

use crate::api::{AppState, run};
use crate::model::{Claims, CreateWish, Wish};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wishes", post(create_wish))
        .route("/wishes/public", get(list_public))
        .route("/wishes/me", get(list_mine))
        .route("/wishes/{id}", delete(delete_wish))
}

/// GET /api/wishes/public?page=1&pageSize=20
async fn list_public(
    State(svc): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResult<Wish>>, ServiceError> {
    Ok(Json(run(&svc, move |s| s.list_public(&params)).await?))
}

async fn list_mine(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResult<Wish>>, ServiceError> {
    Ok(Json(
        run(&svc, move |s| s.list_mine(&claims.sub, &params)).await?,
    ))
}

async fn create_wish(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<CreateWish>,
) -> Result<(StatusCode, Json<Wish>), ServiceError> {
    let wish = run(&svc, move |s| s.create_wish(&claims.sub, input)).await?;
    Ok((StatusCode::CREATED, Json(wish)))
}

async fn delete_wish(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    run(&svc, move |s| s.delete_wish(&id, &claims.sub)).await?;
    Ok(StatusCode::NO_CONTENT)
}
