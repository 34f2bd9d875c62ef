pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::{agent::ChatAgent, config::Config, search::FeedbackSearch, synth::Synthesizer};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<FeedbackSearch>,
    pub synth: Arc<dyn Synthesizer>,
    pub agent: Arc<ChatAgent>,
    pub config: Arc<Config>,
}
