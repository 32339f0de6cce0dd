use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use wishwall_core::ServiceError;

use crate::api::{AppState, run};

/// Paths that don't require authentication.
const PUBLIC_PATHS: &[&str] = &[
    "/api/register",
    "/api/login",
    "/api/app-state",
    "/api/test-ai",
    "/api/wishes/public",
];

/// JWT authentication middleware.
///
/// Checks for a Bearer token in the Authorization header and stores the
/// verified `Claims` as a request extension. Public paths pass through.
pub async fn auth_middleware(
    State(svc): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Some(t) => t.to_string(),
        None => {
            return ServiceError::Unauthorized("missing authorization header".into())
                .into_response();
        }
    };

    match run(&svc, move |s| s.authenticate(&token)).await {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            debug!(path = %req.uri().path(), error = %e, "request rejected");
            e.into_response()
        }
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_match_exactly() {
        assert!(is_public_path("/api/login"));
        assert!(is_public_path("/api/wishes/public/"));
        assert!(!is_public_path("/api/wishes"));
        assert!(!is_public_path("/api/login/extra"));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Some("abc"));
        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert_eq!(extract_bearer(&headers), None);
        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert_eq!(extract_bearer(&headers), None);
    }
}
