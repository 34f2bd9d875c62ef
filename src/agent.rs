use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{Result, TriageError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::tools::ToolDispatcher;
use crate::transport::Transport;

const AGENT_PROMPT: &str = "You are a helpful PM assistant for analyzing product feedback. \
You have access to tools to search feedback, view the triage queue, search documentation, \
and investigate issues. Use the tools when needed to answer user questions. Be concise and helpful.";

const FOLLOW_UP_PROMPT: &str = "You are a helpful PM assistant. Summarize the tool results for \
the user in a clear, actionable way. Focus on insights and recommendations.";

pub const HELP_REPLY: &str = "I can help you search feedback, view your queue, or investigate \
issues. What would you like to know?";

#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    /// Pretty-printed JSON returned by the tool
    pub result: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

fn first_message(response: ChatResponse) -> Result<ChatMessage> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| TriageError::Generation("Chat API returned empty choices".to_string()))
}

/// Two-step tool-using assistant: plan with tools, then summarize their output
pub struct ChatAgent {
    tx: Arc<dyn Transport>,
    tools: Arc<ToolDispatcher>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatAgent {
    pub fn new(tx: Arc<dyn Transport>, tools: Arc<ToolDispatcher>, llm: &LlmConfig) -> Self {
        Self {
            tx,
            tools,
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }

    fn request(&self, messages: Vec<ChatMessage>, with_tools: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: with_tools.then(ToolDispatcher::definitions),
        }
    }

    pub async fn chat(&self, params: ChatParams) -> Result<ChatReply> {
        let message = params
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| TriageError::InvalidInput("Invalid message".to_string()))?;

        let first = self
            .tx
            .chat(&self.request(
                vec![ChatMessage::system(AGENT_PROMPT), ChatMessage::user(&message)],
                true,
            ))
            .await?;
        let reply = first_message(first)?;

        let requested = reply.tool_calls.clone().unwrap_or_default();
        if requested.is_empty() {
            let text = reply.text().trim();
            return Ok(ChatReply {
                response: if text.is_empty() {
                    HELP_REPLY.to_string()
                } else {
                    text.to_string()
                },
                tool_calls: Vec::new(),
            });
        }

        let mut records = Vec::with_capacity(requested.len());
        for call in &requested {
            let args = call.function.parsed_arguments();
            let result = self.tools.dispatch(&call.function.name, &args).await;
            records.push(ToolCallRecord {
                name: call.function.name.clone(),
                result: serde_json::to_string_pretty(&result)?,
            });
        }
        tracing::info!(
            tools = ?records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "Executed tool calls"
        );

        let used = records
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let results = records
            .iter()
            .map(|r| format!("{}: {}", r.name, r.result))
            .collect::<Vec<_>>()
            .join("\n\n");

        let follow_up = self
            .tx
            .chat(&self.request(
                vec![
                    ChatMessage::system(FOLLOW_UP_PROMPT),
                    ChatMessage::user(&message),
                    ChatMessage::assistant(format!("I used these tools: {used}")),
                    ChatMessage::user(format!(
                        "Tool results:\n{results}\n\nPlease summarize this for me."
                    )),
                ],
                false,
            ))
            .await?;

        Ok(ChatReply {
            response: first_message(follow_up)?.text().to_string(),
            tool_calls: records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, FunctionCall, ToolCall};
    use crate::search::test_support::{sample_collection, text_only_search};
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    fn agent(tx: Arc<MockTransport>) -> ChatAgent {
        let tools = Arc::new(ToolDispatcher::new(text_only_search(sample_collection())));
        ChatAgent::new(tx, tools, &LlmConfig::default())
    }

    fn ask(message: &str) -> ChatParams {
        ChatParams {
            message: Some(message.to_string()),
        }
    }

    fn tool_call_response(calls: Vec<(&str, serde_json::Value)>) -> ChatResponse {
        ChatResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(
                        calls
                            .into_iter()
                            .enumerate()
                            .map(|(i, (name, arguments))| ToolCall {
                                id: Some(format!("call_{i}")),
                                kind: Some("function".into()),
                                function: FunctionCall {
                                    name: name.to_string(),
                                    arguments,
                                },
                            })
                            .collect(),
                    ),
                },
            }],
        }
    }

    #[tokio::test]
    async fn test_plain_answer_skips_tools() {
        let tx = Arc::new(MockTransport::new(vec![Ok(ChatResponse::from_text(
            "Hello there.",
        ))]));
        let reply = agent(tx.clone()).chat(ask("hi")).await.expect("reply");

        assert_eq!(reply.response, "Hello there.");
        assert!(reply.tool_calls.is_empty());
        assert_eq!(tx.calls(), 1);
        assert_eq!(
            tx.requests()[0].tools.as_ref().map(Vec::len),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_empty_answer_falls_back_to_help() {
        let tx = Arc::new(MockTransport::new(vec![Ok(ChatResponse::from_text("  "))]));
        let reply = agent(tx).chat(ask("hi")).await.expect("reply");
        assert_eq!(reply.response, HELP_REPLY);
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_order_then_follow_up() {
        let tx = Arc::new(MockTransport::new(vec![
            Ok(tool_call_response(vec![
                ("getQueue", json!("{\"product\":\"d1\"}")),
                ("searchDocs", json!("not json")),
            ])),
            Ok(ChatResponse::from_text("D1 transactions need attention.")),
        ]));
        let reply = agent(tx.clone())
            .chat(ask("what is in the d1 queue?"))
            .await
            .expect("reply");

        assert_eq!(reply.response, "D1 transactions need attention.");
        let names: Vec<&str> = reply.tool_calls.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["getQueue", "searchDocs"]);
        assert!(reply.tool_calls[0].result.contains("fb_004"));
        // invalid arguments parse as {}, so searchDocs reports a missing query
        assert!(reply.tool_calls[1].result.contains("error"));

        let requests = tx.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert!(follow_up.tools.is_none());
        assert_eq!(follow_up.messages[0].text(), FOLLOW_UP_PROMPT);
        assert_eq!(follow_up.messages[1].text(), "what is in the d1 queue?");
        assert_eq!(
            follow_up.messages[2].text(),
            "I used these tools: getQueue, searchDocs"
        );
        let results = follow_up.messages[3].text();
        assert!(results.starts_with("Tool results:\ngetQueue: "));
        assert!(results.contains("\n\nsearchDocs: "));
        assert!(results.ends_with("\n\nPlease summarize this for me."));
    }

    #[tokio::test]
    async fn test_missing_message_is_invalid_input() {
        let tx = Arc::new(MockTransport::new(vec![]));
        let err = agent(tx.clone())
            .chat(ChatParams::default())
            .await
            .expect_err("missing message");
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert_eq!(tx.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let tx = Arc::new(MockTransport::new(vec![Err(TriageError::Generation(
            "upstream down".into(),
        ))]));
        let err = agent(tx).chat(ask("hi")).await.expect_err("failure");
        assert!(matches!(err, TriageError::Generation(_)));
    }
}
