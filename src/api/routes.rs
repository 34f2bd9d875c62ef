use crate::api::{AppState, auth, handlers};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Build the REST API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/store/health", get(handlers::store_health))
        .route("/api/index/health", get(handlers::index_health))
        .route("/api/feedback/search", post(handlers::search_feedback))
        .route("/api/feedback/summarize", post(handlers::summarize_feedback))
        .route("/api/chat", post(handlers::chat))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
}

/// Require `token` on every route except `/health`
pub fn with_bearer_auth(router: Router, token: Option<String>) -> Router {
    match token {
        Some(expected) => router.layer(middleware::from_fn_with_state(
            Arc::new(expected),
            auth::require_bearer,
        )),
        None => router,
    }
}
