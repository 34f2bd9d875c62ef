use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{Result, TriageError};
use crate::filter::FeedbackFilters;
use crate::models::{
    ChatMessage, ChatRequest, FeedbackItem, SourceRef, SummarizeParams, SummaryResponse,
};
use crate::search::FeedbackSearch;
use crate::transport::Transport;

pub const SYSTEM_PROMPT: &str = "You are a product manager analyzing customer feedback. \
Summarize the key themes, issues, and requests from the feedback below. Be concise and \
actionable. Group by theme if appropriate. Highlight any P0/P1 urgent items.";

pub const NO_ITEMS_SUMMARY: &str = "No feedback items found matching the query and filters.";

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn summarize(&self, params: SummarizeParams) -> Result<SummaryResponse>;
}

/// One prompt line per item: `[id] (source, product, urgency, status): "content"`
pub fn build_context(items: &[FeedbackItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "[{}] ({}, {}, {}, {}): \"{}\"",
                item.id, item.source, item.product, item.urgency, item.status, item.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_user_prompt(query: &str, filters: &FeedbackFilters, items: &[FeedbackItem]) -> String {
    format!(
        "Query: \"{query}\"\nFilters: {}\n\nFeedback items ({} total):\n{}\n\n\
Provide a summary of the key themes and actionable insights from this feedback.",
        filters.describe(),
        items.len(),
        build_context(items)
    )
}

pub struct FeedbackSynth {
    search: Arc<FeedbackSearch>,
    tx: Arc<dyn Transport>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl FeedbackSynth {
    pub fn new(search: Arc<FeedbackSearch>, tx: Arc<dyn Transport>, llm: &LlmConfig) -> Self {
        Self {
            search,
            tx,
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }
}

#[async_trait]
impl Synthesizer for FeedbackSynth {
    async fn summarize(&self, params: SummarizeParams) -> Result<SummaryResponse> {
        let max_items = self.search.clamp_max_items(params.max_items);
        let retrieval = self
            .search
            .retrieve_filtered(&params.query, &params.filters, max_items)
            .await?;
        let items = retrieval.items;

        if items.is_empty() {
            tracing::info!(query = %params.query, "No feedback matched, skipping generation");
            return Ok(SummaryResponse {
                summary: NO_ITEMS_SUMMARY.to_string(),
                source_count: 0,
                filters: params.filters,
                sources: Vec::new(),
            });
        }

        tracing::info!(
            query = %params.query,
            items = items.len(),
            method = ?retrieval.method,
            "Summarizing feedback"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_user_prompt(&params.query, &params.filters, &items)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: None,
        };

        let response = self.tx.chat(&request).await?;
        let summary = response
            .choices
            .first()
            .map(|choice| choice.message.text().to_string())
            .ok_or_else(|| {
                TriageError::Generation("Chat API returned empty choices".to_string())
            })?;

        Ok(SummaryResponse {
            summary,
            source_count: items.len(),
            filters: params.filters,
            sources: items.iter().map(SourceRef::from).collect(),
        })
    }
}
