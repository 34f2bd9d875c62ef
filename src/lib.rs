pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod relevance;
pub mod search;
pub mod semantic;
pub mod service;
pub mod store;
pub mod synth;
pub mod tools;
pub mod transport;

use std::sync::Arc;

use crate::agent::ChatAgent;
use crate::api::AppState;
use crate::config::Config;
use crate::error::Result;
use crate::search::FeedbackSearch;
use crate::service::FeedbackTriageService;
use crate::store::{BlobFeedbackLoader, FeedbackCache, build_blob_store};
use crate::synth::{FeedbackSynth, Synthesizer};
use crate::tools::ToolDispatcher;
use crate::transport::{OpenAiTransport, Transport};

/// Composition root: one cache, one index client, one chat transport
pub struct TriageApp {
    pub config: Arc<Config>,
    pub search: Arc<FeedbackSearch>,
    pub synth: Arc<dyn Synthesizer>,
    pub agent: Arc<ChatAgent>,
}

impl TriageApp {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let blob = build_blob_store(&config)?;
        let loader = Arc::new(BlobFeedbackLoader::new(blob, config.store.key.clone()));
        let cache = Arc::new(FeedbackCache::new(loader, config.store.cache));
        let index = semantic::build_index(&config)?;

        let search = Arc::new(FeedbackSearch::new(
            cache,
            index,
            config.search.clone(),
            config.semantic.max_results,
        ));

        let transport: Arc<dyn Transport> = Arc::new(OpenAiTransport::new(
            config.llm.api_url.clone(),
            config.llm.api_key.clone(),
        )?);

        let synth = Arc::new(FeedbackSynth::new(
            Arc::clone(&search),
            Arc::clone(&transport),
            &config.llm,
        ));
        let agent = Arc::new(ChatAgent::new(
            transport,
            Arc::new(ToolDispatcher::new(Arc::clone(&search))),
            &config.llm,
        ));

        Ok(Self {
            config,
            search,
            synth,
            agent,
        })
    }

    pub fn mcp_service(&self) -> FeedbackTriageService {
        FeedbackTriageService::new(
            Arc::clone(&self.search),
            Arc::clone(&self.synth),
            Arc::clone(&self.config),
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            search: Arc::clone(&self.search),
            synth: Arc::clone(&self.synth),
            agent: Arc::clone(&self.agent),
            config: Arc::clone(&self.config),
        }
    }
}
