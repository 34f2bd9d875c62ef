/// Agent-facing tools dispatched from model tool calls
pub mod docs;
pub mod investigate;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{Result, TriageError};
use crate::models::{FeedbackItem, FunctionDefinition, SearchParams, Status, ToolDefinition};
use crate::search::FeedbackSearch;

const QUEUE_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetQueueArgs {
    /// Only return items for this product
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchDocsArgs {
    /// Documentation search query
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InvestigateArgs {
    /// The topic to investigate
    pub question: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateStatusArgs {
    /// Feedback item ID
    pub id: String,
    pub status: Status,
}

fn parameters_for<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

fn definition(name: &'static str, description: &'static str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        kind: "function",
        function: FunctionDefinition {
            name,
            description,
            parameters,
        },
    }
}

fn parse_args<T: DeserializeOwned>(name: &str, args: &Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args)
        .map_err(|e| TriageError::InvalidInput(format!("Invalid arguments for {name}: {e}")))
}

/// Routes tool calls by name onto the query core
pub struct ToolDispatcher {
    search: Arc<FeedbackSearch>,
}

impl ToolDispatcher {
    pub fn new(search: Arc<FeedbackSearch>) -> Self {
        Self { search }
    }

    /// Tool definitions in OpenAI function-calling form
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            definition(
                "searchFeedback",
                "Search product feedback by query, optionally filter by source, status, urgency or product",
                parameters_for::<SearchParams>(),
            ),
            definition(
                "getQueue",
                "Get all feedback items in the queue that need triage",
                parameters_for::<GetQueueArgs>(),
            ),
            definition(
                "searchDocs",
                "Search product documentation for context on a product or feature",
                parameters_for::<SearchDocsArgs>(),
            ),
            definition(
                "investigate",
                "Deep investigation of a feedback topic, combining feedback data with docs context",
                parameters_for::<InvestigateArgs>(),
            ),
            definition(
                "updateStatus",
                "Update the status of a feedback item",
                parameters_for::<UpdateStatusArgs>(),
            ),
        ]
    }

    /// Run one tool. Never fails: errors come back as `{"error": "..."}`.
    pub async fn dispatch(&self, name: &str, args: &Value) -> Value {
        match self.try_dispatch(name, args).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn try_dispatch(&self, name: &str, args: &Value) -> Result<Value> {
        tracing::debug!(tool = name, %args, "Dispatching tool call");
        match name {
            "getQueue" => {
                let args: GetQueueArgs = parse_args(name, args)?;
                let queue = self.queue(args.product.as_deref()).await?;
                Ok(serde_json::to_value(queue)?)
            }
            "searchFeedback" => {
                let params: SearchParams = parse_args(name, args)?;
                Ok(serde_json::to_value(self.search.search(params).await?)?)
            }
            "searchDocs" => {
                let args: SearchDocsArgs = parse_args(name, args)?;
                Ok(serde_json::to_value(docs::search_docs(&args.query))?)
            }
            "investigate" => {
                let args: InvestigateArgs = parse_args(name, args)?;
                if args.question.trim().is_empty() {
                    return Err(TriageError::InvalidInput("question is required".to_string()));
                }
                let collection = self.search.collection().await?;
                Ok(serde_json::to_value(investigate::investigate(
                    &collection,
                    &args.question,
                ))?)
            }
            "updateStatus" => {
                let args: UpdateStatusArgs = parse_args(name, args)?;
                Ok(json!({
                    "acknowledged": true,
                    "persisted": false,
                    "supported": false,
                    "id": args.id,
                    "requestedStatus": args.status,
                    "message": format!(
                        "Feedback records are read-only; {} was not changed to {}.",
                        args.id, args.status
                    ),
                }))
            }
            other => Err(TriageError::InvalidInput(format!("Unknown tool: {other}"))),
        }
    }

    /// Items awaiting triage, optionally for one product
    async fn queue(&self, product: Option<&str>) -> Result<Vec<FeedbackItem>> {
        let collection = self.search.collection().await?;
        Ok(collection
            .iter()
            .filter(|item| item.status == Status::New)
            .filter(|item| product.is_none_or(|p| p.is_empty() || item.product == p))
            .take(QUEUE_LIMIT)
            .cloned()
            .collect())
    }
}
