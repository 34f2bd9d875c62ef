use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::error::{Result, TriageError};
use crate::models::{ChatRequest, ChatResponse};

const MAX_RETRIES: u8 = 5;
const MAX_RETRY_DURATION: Duration = Duration::from_secs(300); // 5 minutes max
const MAX_DELAY: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

/// Exponential backoff with jitter for the given 1-based attempt
pub(crate) fn backoff_delay(attempt: u8) -> Duration {
    let base_delay = Duration::from_millis(200 * 2u64.pow(attempt.saturating_sub(1) as u32));
    let jitter = rand::thread_rng().gen_range(0.8..=1.2);
    let delay = Duration::from_millis((base_delay.as_millis() as f64 * jitter) as u64);
    std::cmp::min(delay, MAX_DELAY)
}

/// Client for any OpenAI-compatible chat completions endpoint
pub struct OpenAiTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

impl OpenAiTransport {
    pub fn new(api_url: String, api_key: String) -> Result<Self> {
        if api_url.trim().is_empty() {
            return Err(TriageError::Config("llm.api_url must not be empty".to_string()));
        }
        if api_key.trim().is_empty() {
            // Search keeps working; generation requests will be rejected upstream
            tracing::warn!("LLM API key is not configured; summarize and chat will fail");
        }
        let client = Client::builder()
            .build()
            .map_err(|e| TriageError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl Transport for OpenAiTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let start_time = Instant::now();
        let mut attempts = 0;

        while attempts < MAX_RETRIES {
            if start_time.elapsed() > MAX_RETRY_DURATION {
                return Err(TriageError::Generation(format!(
                    "Chat request timed out after {} seconds (max retry duration exceeded)",
                    MAX_RETRY_DURATION.as_secs()
                )));
            }

            attempts += 1;

            match self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(req)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(|e| {
                            TriageError::Generation(format!(
                                "Failed to parse chat completion response: {e}"
                            ))
                        });
                    }

                    // Client errors other than rate limiting will not improve on retry
                    let retryable = status.is_server_error() || status.as_u16() == 429;
                    if !retryable || attempts >= MAX_RETRIES {
                        return Err(TriageError::Generation(format!(
                            "Chat API returned {status} after {attempts} attempts: {}",
                            response
                                .text()
                                .await
                                .unwrap_or_else(|_| "Unknown error".to_string())
                        )));
                    }
                    tracing::warn!(%status, attempts, "Chat API request failed, retrying");
                }
                Err(e) => {
                    if attempts >= MAX_RETRIES {
                        return Err(TriageError::Generation(format!(
                            "Failed to send chat request after {attempts} attempts: {e}"
                        )));
                    }
                    tracing::warn!(error = %e, attempts, "Chat API unreachable, retrying");
                }
            }

            if attempts < MAX_RETRIES {
                sleep(backoff_delay(attempts)).await;
            }
        }

        Err(TriageError::Generation(format!(
            "Chat request failed after {MAX_RETRIES} attempts"
        )))
    }
}
