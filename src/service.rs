use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::error::TriageError;
use crate::models::{SearchParams, SummarizeParams};
use crate::search::FeedbackSearch;
use crate::synth::Synthesizer;

/// Client mistakes are `invalid_params`; everything else is `internal_error`
fn to_error_data(tool: &str, e: TriageError) -> ErrorData {
    match e {
        TriageError::InvalidInput(msg) => ErrorData::invalid_params(msg, None),
        other => {
            tracing::error!("{tool} error: {other}");
            ErrorData::internal_error(other.to_string(), None)
        }
    }
}

fn json_result<T: Serialize>(response: T) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(response).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}

/// MCP server exposing feedback search and summarization
#[derive(Clone)]
pub struct FeedbackTriageService {
    tool_router: ToolRouter<Self>,
    search: Arc<FeedbackSearch>,
    synth: Arc<dyn Synthesizer>,
    config: Arc<Config>,
}

impl FeedbackTriageService {
    pub fn new(
        search: Arc<FeedbackSearch>,
        synth: Arc<dyn Synthesizer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            search,
            synth,
            config,
        }
    }
}

#[tool_router]
impl FeedbackTriageService {
    #[tool(
        description = "Search customer feedback by free-text query with optional source, status, urgency and product filters"
    )]
    pub async fn search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.search.search(params.0).await {
            Ok(response) => json_result(response),
            Err(e) => Err(to_error_data("search", e)),
        }
    }

    #[tool(
        description = "Summarize the key themes in feedback matching a query and optional filters"
    )]
    pub async fn summarize(
        &self,
        params: Parameters<SummarizeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.synth.summarize(params.0).await {
            Ok(response) => json_result(response),
            Err(e) => Err(to_error_data("summarize", e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for FeedbackTriageService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "Feedback triage server: search and summarize customer feedback".into(),
            ),
        }
    }
}
