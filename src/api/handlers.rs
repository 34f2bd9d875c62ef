use crate::agent::{ChatParams, ChatReply};
use crate::api::AppState;
use crate::error::{Result, TriageError};
use crate::models::{SearchParams, SearchResponse, SummarizeParams, SummaryResponse};
use crate::semantic::IndexHit;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

const INDEX_PROBE_QUERY: &str = "Workers performance issues";
const INDEX_PROBE_RESULTS: usize = 5;
const SAMPLE_IDS: usize = 5;

/// Unwrap a JSON body, turning malformed input into a 400
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| TriageError::InvalidInput(rejection.body_text()))
}

pub async fn health_check() -> &'static str {
    "ok"
}

/// Search feedback
pub async fn search_feedback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<SearchResponse>> {
    let params = body(payload)?;
    Ok(Json(state.search.search(params).await?))
}

/// Summarize matching feedback
pub async fn summarize_feedback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SummarizeParams>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    let params = body(payload)?;
    Ok(Json(state.synth.summarize(params).await?))
}

/// Tool-using PM assistant
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatParams>, JsonRejection>,
) -> Result<Json<ChatReply>> {
    let params = body(payload)?;
    Ok(Json(state.agent.chat(params).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreHealth {
    pub success: bool,
    pub total_items: usize,
    pub sample_ids: Vec<String>,
}

/// Confirm the collection loads
pub async fn store_health(State(state): State<AppState>) -> Result<Json<StoreHealth>> {
    let collection = state.search.collection().await?;
    Ok(Json(StoreHealth {
        success: true,
        total_items: collection.len(),
        sample_ids: collection
            .iter()
            .take(SAMPLE_IDS)
            .map(|item| item.id.clone())
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHealth {
    pub success: bool,
    pub index_name: String,
    pub query: &'static str,
    pub result_count: usize,
    pub results: Vec<IndexHit>,
}

/// Run a fixed probe query against the semantic index
pub async fn index_health(State(state): State<AppState>) -> Response {
    let index_name = state.config.semantic.index_name.clone();
    match state
        .search
        .index()
        .search(INDEX_PROBE_QUERY, INDEX_PROBE_RESULTS)
        .await
    {
        Ok(results) => Json(IndexHealth {
            success: true,
            index_name,
            query: INDEX_PROBE_QUERY,
            result_count: results.len(),
            results,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, index = %index_name, "Semantic index probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "indexName": index_name,
                    "error": e.to_string(),
                    "hint": "Set semantic.endpoint (or SEMANTIC_SEARCH_URL) and make sure the index has finished indexing the feedback objects.",
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ChatAgent;
    use crate::api::build_router;
    use crate::config::{Config, LlmConfig};
    use crate::models::ChatResponse;
    use crate::search::FeedbackSearch;
    use crate::search::test_support::{missing_collection_search, sample_collection, text_only_search};
    use crate::synth::FeedbackSynth;
    use crate::tools::ToolDispatcher;
    use crate::transport::mock::MockTransport;
    use axum::{Router, body::Body, http::Request};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(search: Arc<FeedbackSearch>, responses: Vec<Result<ChatResponse>>) -> Router {
        let tx = Arc::new(MockTransport::new(responses));
        let llm = LlmConfig::default();
        let state = AppState {
            synth: Arc::new(FeedbackSynth::new(search.clone(), tx.clone(), &llm)),
            agent: Arc::new(ChatAgent::new(
                tx,
                Arc::new(ToolDispatcher::new(search.clone())),
                &llm,
            )),
            search,
            config: Arc::new(Config::default()),
        };
        build_router(state)
    }

    fn app() -> Router {
        app_with(text_only_search(sample_collection()), Vec::new())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_search_returns_envelope() {
        let (status, body) = send(
            app(),
            post(
                "/api/feedback/search",
                r#"{"query":"cold start","limit":"2"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["searchMethod"], "text");
        assert_eq!(body["totalResults"], 2);
        assert_eq!(body["results"][0]["id"], "fb_001");
    }

    #[tokio::test]
    async fn test_empty_query_is_400() {
        let (status, body) = send(app(), post("/api/feedback/search", r#"{"query":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "Query is required");
    }

    #[tokio::test]
    async fn test_malformed_body_and_bad_enum_are_400() {
        let (status, _) = send(app(), post("/api/feedback/search", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app(),
            post(
                "/api/feedback/search",
                r#"{"query":"latency","urgency":"P9"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_collection_is_404() {
        let (status, body) = send(
            app_with(missing_collection_search(), Vec::new()),
            post("/api/feedback/search", r#"{"query":"latency"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Feedback data not found");
    }

    #[tokio::test]
    async fn test_summarize_with_no_matches_is_canned() {
        let (status, body) = send(
            app(),
            post(
                "/api/feedback/summarize",
                r#"{"query":"latency","urgency":"P3","maxItems":5}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], crate::synth::NO_ITEMS_SUMMARY);
        assert_eq!(body["sourceCount"], 0);
        assert_eq!(body["filters"]["urgency"], "P3");
    }

    #[tokio::test]
    async fn test_summarize_generation_failure_is_502() {
        let failing_app = app_with(
            text_only_search(sample_collection()),
            vec![Err(TriageError::Generation("upstream 500".into()))],
        );
        let (status, body) = send(
            failing_app,
            post("/api/feedback/summarize", r#"{"query":"latency"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Summary generation failed");
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let chat_app = app_with(
            text_only_search(sample_collection()),
            vec![Ok(ChatResponse::from_text("Ask me about your queue."))],
        );
        let (status, body) = send(chat_app, post("/api/chat", r#"{"message":"hello"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Ask me about your queue.");
        assert_eq!(body["toolCalls"], serde_json::json!([]));

        let (status, _) = send(app(), post("/api/chat", r#"{}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_health_reports_sample_ids() {
        let (status, body) = send(app(), get("/api/store/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["totalItems"], 5);
        assert_eq!(body["sampleIds"].as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn test_index_health_unavailable_is_503() {
        let (status, body) = send(app(), get("/api/index/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert!(body["hint"].is_string());
    }

    #[tokio::test]
    async fn test_plain_health() {
        let response = app().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
