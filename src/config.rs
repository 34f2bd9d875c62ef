use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::relevance::TokenPolicy;

/// Main configuration structure for the feedback triage server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub store: StoreConfig,
    pub semantic: SemanticConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    /// "stdio" (MCP over stdio) or "http" (JSON API + streamable HTTP MCP)
    pub transport: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "feedback-triage".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            transport: "stdio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub mcp_path: String,
    /// Optional bearer token required on every route except /health
    pub bearer_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            mcp_path: "/mcp".to_string(),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    File,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Root directory for the file store
    pub path: String,
    /// Base URL for the HTTP store
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    /// Object key of the full feedback collection
    pub key: String,
    /// Keep the collection in memory after the first load
    pub cache: bool,
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: "data".to_string(),
            base_url: None,
            api_token: None,
            key: "feedback.json".to_string(),
            cache: true,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    /// Full URL of the index search endpoint
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub index_name: String,
    pub max_results: usize,
    pub rewrite_query: bool,
    pub timeout_seconds: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_token: None,
            index_name: "feedback-mcp".to_string(),
            max_results: 50,
            rewrite_query: true,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "llama-3.1-8b-instant".to_string(),
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_token_len: usize,
    pub short_token_allowlist: Vec<String>,
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_max_items: usize,
    pub max_max_items: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let policy = TokenPolicy::default();
        Self {
            min_token_len: policy.min_token_len,
            short_token_allowlist: policy.short_token_allowlist,
            default_limit: 10,
            max_limit: 50,
            default_max_items: 15,
            max_max_items: 30,
        }
    }
}

impl SearchConfig {
    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            min_token_len: self.min_token_len,
            short_token_allowlist: self.short_token_allowlist.clone(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("FEEDBACK_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server
        if let Ok(name) = env::var("FEEDBACK_SERVER_NAME") {
            self.server.name = name;
        }
        if let Ok(transport) = env::var("FEEDBACK_TRANSPORT") {
            self.server.transport = transport;
        }

        // HTTP
        if let Ok(bind) = env::var("FEEDBACK_HTTP_BIND") {
            self.http.bind = bind;
        }
        if let Ok(path) = env::var("FEEDBACK_HTTP_PATH") {
            self.http.mcp_path = path;
        }
        if let Ok(token) = env::var("FEEDBACK_BEARER_TOKEN") {
            self.http.bearer_token = Some(token);
        }

        // Store
        if let Ok(kind) = env::var("FEEDBACK_STORE_KIND") {
            match kind.to_lowercase().as_str() {
                "file" => self.store.kind = StoreKind::File,
                "http" => self.store.kind = StoreKind::Http,
                other => tracing::warn!("Unknown FEEDBACK_STORE_KIND '{}', ignoring", other),
            }
        }
        if let Ok(path) = env::var("FEEDBACK_STORE_PATH") {
            self.store.path = path;
        }
        if let Ok(url) = env::var("FEEDBACK_STORE_URL") {
            self.store.base_url = Some(url);
        }
        if let Ok(token) = env::var("FEEDBACK_STORE_TOKEN") {
            self.store.api_token = Some(token);
        }
        if let Ok(key) = env::var("FEEDBACK_STORE_KEY") {
            self.store.key = key;
        }
        if let Ok(cache) = env::var("FEEDBACK_STORE_CACHE") {
            if let Ok(enabled) = cache.parse() {
                self.store.cache = enabled;
            }
        }

        // Semantic index
        if let Ok(endpoint) = env::var("SEMANTIC_SEARCH_URL") {
            self.semantic.endpoint = Some(endpoint);
            self.semantic.enabled = true;
        }
        if let Ok(token) = env::var("SEMANTIC_SEARCH_TOKEN") {
            self.semantic.api_token = Some(token);
        }
        if let Ok(enabled) = env::var("SEMANTIC_SEARCH_ENABLED") {
            if let Ok(enabled) = enabled.parse() {
                self.semantic.enabled = enabled;
            }
        }
        if let Ok(name) = env::var("SEMANTIC_INDEX_NAME") {
            self.semantic.index_name = name;
        }

        // LLM
        if let Ok(api_key) = env::var("LLM_API_KEY").or_else(|_| env::var("GROQ_API_KEY")) {
            self.llm.api_key = api_key;
        }
        if let Ok(url) = env::var("LLM_API_URL") {
            self.llm.api_url = url;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        // Search
        if let Ok(len) = env::var("FEEDBACK_MIN_TOKEN_LEN") {
            if let Ok(len) = len.parse() {
                self.search.min_token_len = len;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !matches!(self.server.transport.as_str(), "stdio" | "http" | "streamable_http") {
            return Err(format!(
                "server.transport must be 'stdio' or 'http', got '{}'",
                self.server.transport
            )
            .into());
        }

        if self.store.kind == StoreKind::Http && self.store.base_url.is_none() {
            return Err("store.base_url is required when store.kind is 'http'".into());
        }
        if self.store.key.is_empty() {
            return Err("store.key cannot be empty".into());
        }

        if self.semantic.enabled && self.semantic.endpoint.is_none() {
            return Err(
                "semantic.enabled is set but semantic.endpoint is missing; text search will be used"
                    .into(),
            );
        }

        if self.search.max_limit == 0 || self.search.max_max_items == 0 {
            return Err("search.max_limit and search.max_max_items must be at least 1".into());
        }
        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err("search.default_limit must be between 1 and search.max_limit".into());
        }
        if self.search.default_max_items == 0
            || self.search.default_max_items > self.search.max_max_items
        {
            return Err(
                "search.default_max_items must be between 1 and search.max_max_items".into(),
            );
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err("llm.temperature must be between 0.0 and 2.0".into());
        }

        if self.llm.api_key.is_empty() {
            return Err("LLM_API_KEY is not set; summarize and chat will fail".into());
        }

        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_seconds)
    }

    pub fn semantic_timeout(&self) -> Duration {
        Duration::from_secs(self.semantic.timeout_seconds)
    }
}
