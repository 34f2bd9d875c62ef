use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Token from `?access_token=` or `?token=`, for clients that cannot set headers
fn query_token(query: Option<&str>) -> Option<&str> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == "access_token" || k == "token").then_some(v)
    })
}

fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let authorized = header_token(req.headers()) == Some(expected.as_str())
        || query_token(req.uri().query()) == Some(expected.as_str());
    if !authorized {
        tracing::warn!(path = %req.uri().path(), "Rejected unauthenticated request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::with_bearer_auth;
    use axum::{Router, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        let router = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/store/health", get(|| async { "store" }));
        with_bearer_auth(router, Some("s3cret".to_string()))
    }

    async fn status_of(req: Request<Body>) -> StatusCode {
        app().oneshot(req).await.unwrap().status()
    }

    #[test]
    fn test_query_token_keys() {
        assert_eq!(query_token(Some("a=1&token=abc")), Some("abc"));
        assert_eq!(query_token(Some("access_token=xyz")), Some("xyz"));
        assert_eq!(query_token(Some("tokens=abc")), None);
        assert_eq!(query_token(None), None);
    }

    #[tokio::test]
    async fn test_health_is_exempt() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(status_of(req).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_is_rejected() {
        let missing = Request::builder()
            .uri("/api/store/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(missing).await, StatusCode::UNAUTHORIZED);

        let wrong = Request::builder()
            .uri("/api/store/health")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(wrong).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_header_and_query_tokens_are_accepted() {
        let header_req = Request::builder()
            .uri("/api/store/health")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(header_req).await, StatusCode::OK);

        let query_req = Request::builder()
            .uri("/api/store/health?access_token=s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(query_req).await, StatusCode::OK);
    }
}
