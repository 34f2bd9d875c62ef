use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, TriageError};

#[cfg(test)]
use mockall::automock;

/// A ranked reference returned by the semantic index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    /// Indexed object name, e.g. `feedback/fb_001.json`
    pub filename: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl IndexHit {
    /// Feedback id encoded in the filename (`feedback/fb_001.json` -> `fb_001`)
    pub fn feedback_id(&self) -> &str {
        let name = self.filename.as_str();
        let name = name.strip_prefix("feedback/").unwrap_or(name);
        name.strip_suffix(".json").unwrap_or(name)
    }
}

/// External semantic search over the same collection the store serves
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<IndexHit>>;
}

#[derive(Serialize)]
struct IndexSearchRequest<'a> {
    query: &'a str,
    max_num_results: usize,
    rewrite_query: bool,
}

#[derive(Deserialize)]
struct HitPage {
    data: Vec<IndexHit>,
}

/// Accepts both `{"result": {"data": [...]}}` and `{"data": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexSearchResponse {
    Wrapped { result: HitPage },
    Bare(HitPage),
}

impl IndexSearchResponse {
    fn into_hits(self) -> Vec<IndexHit> {
        match self {
            IndexSearchResponse::Wrapped { result } => result.data,
            IndexSearchResponse::Bare(page) => page.data,
        }
    }
}

/// HTTP client for a managed semantic search endpoint
pub struct HttpSemanticIndex {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    rewrite_query: bool,
}

impl HttpSemanticIndex {
    pub fn new(
        client: Client,
        endpoint: String,
        api_token: Option<String>,
        rewrite_query: bool,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_token,
            rewrite_query,
        }
    }
}

#[async_trait]
impl SemanticIndex for HttpSemanticIndex {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<IndexHit>> {
        let body = IndexSearchRequest {
            query,
            max_num_results: max_results,
            rewrite_query: self.rewrite_query,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TriageError::Semantic(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TriageError::Semantic(format!("index returned {status}: {text}")));
        }

        let parsed: IndexSearchResponse = response
            .json()
            .await
            .map_err(|e| TriageError::Semantic(format!("unexpected response payload: {e}")))?;

        Ok(parsed.into_hits())
    }
}

/// Stand-in used when no index is configured; every search fails so callers fall back
pub struct DisabledIndex;

#[async_trait]
impl SemanticIndex for DisabledIndex {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<IndexHit>> {
        Err(TriageError::Semantic(
            "semantic index is not configured".to_string(),
        ))
    }
}

/// Build the index client described by the `semantic` config section
pub fn build_index(config: &Config) -> Result<Arc<dyn SemanticIndex>> {
    match (&config.semantic.endpoint, config.semantic.enabled) {
        (Some(endpoint), true) => {
            let client = Client::builder()
                .timeout(config.semantic_timeout())
                .build()
                .map_err(|e| TriageError::Config(format!("Failed to build HTTP client: {e}")))?;
            info!(
                endpoint = %endpoint,
                index = %config.semantic.index_name,
                "Semantic search enabled"
            );
            Ok(Arc::new(HttpSemanticIndex::new(
                client,
                endpoint.clone(),
                config.semantic.api_token.clone(),
                config.semantic.rewrite_query,
            )))
        }
        _ => {
            info!("Semantic search disabled; using text search only");
            Ok(Arc::new(DisabledIndex))
        }
    }
}
