use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::filter::FeedbackFilters;

/// Flexible integer deserializer to handle string, float, or int inputs from different MCP clients
fn deserialize_flexible_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(u64),
        Float(f64),
        String(String),
    }

    let value = Option::<FlexibleInt>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(FlexibleInt::Int(i)) => Ok(Some(i as usize)),
        Some(FlexibleInt::Float(f)) if f >= 0.0 => Ok(Some(f as usize)),
        Some(FlexibleInt::Float(f)) => Err(serde::de::Error::custom(format!(
            "expected a non-negative number, got {f}"
        ))),
        Some(FlexibleInt::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Channel a piece of feedback arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Support,
    Discord,
    Twitter,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Support => "support",
            Source::Discord => "discord",
            Source::Twitter => "twitter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

/// Urgency tier, P0 is the most urgent
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
pub enum Urgency {
    P0,
    P1,
    P2,
    P3,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [Urgency::P0, Urgency::P1, Urgency::P2, Urgency::P3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::P0 => "P0",
            Urgency::P1 => "P1",
            Urgency::P2 => "P2",
            Urgency::P3 => "P3",
        }
    }
}

/// Triage status. `queued` and `done` are accepted on input as the names
/// the agent tool schema uses for `new` and `resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[serde(alias = "queued")]
    New,
    InProgress,
    #[serde(alias = "done")]
    Resolved,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Source, Sentiment, Urgency, Status);

/// A single customer feedback record as stored in the blob store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub id: String,
    pub content: String,
    pub source: Source,
    pub product: String,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// Parameters for the search operation (HTTP, MCP and agent tool)
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "The search query to find relevant feedback")]
    pub query: String,

    #[serde(flatten)]
    pub filters: FeedbackFilters,

    #[schemars(description = "Maximum number of results to return (1-50, default 10)")]
    #[serde(default, deserialize_with = "deserialize_flexible_usize")]
    pub limit: Option<usize>,
}

/// Parameters for the summarize operation
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeParams {
    #[schemars(description = "The search query to find relevant feedback to summarize")]
    pub query: String,

    #[serde(flatten)]
    pub filters: FeedbackFilters,

    #[schemars(description = "Maximum feedback items to include in the summary (1-30, default 15)")]
    #[serde(default, deserialize_with = "deserialize_flexible_usize")]
    pub max_items: Option<usize>,
}

/// Which retrieval path produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Semantic index lookup joined against the store
    Semantic,
    /// Local term-overlap ranking
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub search_method: SearchMethod,
    pub total_results: usize,
    pub filters: FeedbackFilters,
    pub results: Vec<FeedbackItem>,
}

/// Projection of a feedback item cited by a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub content: String,
    pub source: Source,
    pub product: String,
    pub urgency: Urgency,
    pub status: Status,
}

impl From<&FeedbackItem> for SourceRef {
    fn from(item: &FeedbackItem) -> Self {
        Self {
            id: item.id.clone(),
            content: item.content.clone(),
            source: item.source,
            product: item.product.clone(),
            urgency: item.urgency,
            status: item.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: String,
    pub source_count: usize,
    pub filters: FeedbackFilters,
    pub sources: Vec<SourceRef>,
}

// OpenAI-compatible chat message format
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded string per the OpenAI format; some providers send an object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl FunctionCall {
    /// Arguments as a JSON object; unparseable arguments become `{}`
    pub fn parsed_arguments(&self) -> serde_json::Value {
        match &self.arguments {
            serde_json::Value::String(raw) => serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default())),
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        }
    }
}

/// Tool definition advertised to the model
#[derive(Debug, Serialize, Clone)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Serialize, Clone)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

// Chat completions request format
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

// Chat completions response format
#[derive(Debug, Deserialize, Clone)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Convenience for building canned responses
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChatMessage::assistant(text),
            }],
        }
    }
}

#[cfg(test)]
impl FeedbackItem {
    /// Test fixture with neutral defaults; adjust fields with struct update syntax
    pub(crate) fn fixture(id: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            content: content.to_string(),
            source: Source::Support,
            product: "workers".to_string(),
            sentiment: Sentiment::Neutral,
            urgency: Urgency::P2,
            status: Status::New,
            timestamp: DateTime::parse_from_rfc3339("2025-01-10T08:00:00.000Z")
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feedback_item_parses_generated_record() {
        let raw = json!({
            "id": "fb_001",
            "content": "Workers cold starts are killing our API latency.",
            "source": "discord",
            "product": "workers",
            "sentiment": "negative",
            "urgency": "P0",
            "status": "in_progress",
            "timestamp": "2025-01-03T14:00:00.000Z"
        });

        let item: FeedbackItem = serde_json::from_value(raw).expect("record should parse");
        assert_eq!(item.source, Source::Discord);
        assert_eq!(item.urgency, Urgency::P0);
        assert_eq!(item.status, Status::InProgress);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let raw = json!({
            "id": "fb_002",
            "content": "x",
            "source": "email",
            "product": "r2",
            "sentiment": "negative",
            "urgency": "P0",
            "status": "new",
            "timestamp": "2025-01-03T14:00:00Z"
        });
        assert!(serde_json::from_value::<FeedbackItem>(raw).is_err());
    }

    #[test]
    fn test_status_aliases_serialize_canonically() {
        let queued: Status = serde_json::from_value(json!("queued")).expect("alias");
        let done: Status = serde_json::from_value(json!("done")).expect("alias");
        assert_eq!(queued, Status::New);
        assert_eq!(done, Status::Resolved);
        assert_eq!(serde_json::to_value(queued).expect("serialize"), json!("new"));
    }

    #[test]
    fn test_search_params_accept_string_limit() {
        let params: SearchParams = serde_json::from_value(json!({
            "query": "cold start",
            "status": "resolved",
            "limit": "5"
        }))
        .expect("params should parse");

        assert_eq!(params.limit, Some(5));
        assert_eq!(params.filters.status, Some(Status::Resolved));
    }

    #[test]
    fn test_query_is_required_in_params_and_schema() {
        assert!(serde_json::from_value::<SearchParams>(json!({"status": "new"})).is_err());
        assert!(serde_json::from_value::<SummarizeParams>(json!({"maxItems": 3})).is_err());

        for schema in [
            serde_json::to_value(schemars::schema_for!(SearchParams)).expect("schema"),
            serde_json::to_value(schemars::schema_for!(SummarizeParams)).expect("schema"),
        ] {
            let required = schema["required"].as_array().cloned().unwrap_or_default();
            assert!(required.contains(&json!("query")));
        }
    }

    #[test]
    fn test_summarize_params_use_camel_case() {
        let params: SummarizeParams =
            serde_json::from_value(json!({"query": "pricing", "maxItems": 3, "product": "r2"}))
                .expect("params should parse");
        assert_eq!(params.max_items, Some(3));
        assert_eq!(params.filters.product.as_deref(), Some("r2"));
    }

    #[test]
    fn test_function_call_arguments_from_string_or_object() {
        let from_string = FunctionCall {
            name: "getQueue".into(),
            arguments: json!("{\"product\":\"r2\"}"),
        };
        let from_object = FunctionCall {
            name: "getQueue".into(),
            arguments: json!({"product": "r2"}),
        };
        let broken = FunctionCall {
            name: "getQueue".into(),
            arguments: json!("{not json"),
        };

        assert_eq!(from_string.parsed_arguments(), json!({"product": "r2"}));
        assert_eq!(from_object.parsed_arguments(), json!({"product": "r2"}));
        assert_eq!(broken.parsed_arguments(), json!({}));
    }
}
