use std::sync::Arc;

use crate::config::Config;

pub mod content_cache;
pub mod gamification_service;
pub mod lesson_service;
pub mod llm_client;
pub mod narration_service;
pub mod orchestrator;
pub mod progress_service;
pub mod quiz_service;

use content_cache::ContentCache;
use llm_client::{AzureOpenAiClient, ChatCompletion};
use narration_service::{AzureSpeechClient, SpeechSynthesizer};
use progress_service::{InMemoryProgressStore, ProgressTracker};

pub struct AppState {
    pub config: Config,
    pub llm: Arc<dyn ChatCompletion>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub progress: ProgressTracker,
    pub content: ContentCache,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        if !config.azure_speech.is_configured() {
            tracing::warn!("Azure Speech is not configured; narration is disabled");
        }

        let llm = Arc::new(AzureOpenAiClient::new(config.azure_openai.clone())?);
        let speech = Arc::new(AzureSpeechClient::new(config.azure_speech.clone())?);

        Ok(Self::with_clients(config, llm, speech))
    }

    /// Builds the state around caller-supplied upstream clients.
    pub fn with_clients(
        config: Config,
        llm: Arc<dyn ChatCompletion>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let progress = ProgressTracker::new(
            Arc::new(InMemoryProgressStore::new()),
            config.learning.clone(),
        );
        let content = ContentCache::new(config.learning.content_cache_capacity);

        Self {
            config,
            llm,
            speech,
            progress,
            content,
        }
    }
}
