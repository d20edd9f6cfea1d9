//! Service clients for AcrossBoard
//!
//! The puzzle service generates clues and layouts; the assistant service
//! answers clue conversations. Both sit behind traits so the controller can
//! be driven by scripted mocks in tests.

use std::sync::Arc;

use tracing::{debug, warn};

pub mod client;
mod error;
mod http;
mod types;

pub use client::{AssistantService, PuzzleService};
#[cfg(test)]
pub use client::mock;
pub use error::ServiceError;
pub use http::HttpServiceClient;
pub use types::{
    ChatReply, ChatTypesResponse, CluesResponse, DifficultyLevelsResponse, GenerateCluesRequest,
    GenerateLayoutRequest, Layout, ModelsResponse, ReplyRequest,
};

use crate::config::ServiceConfig;
use crate::domain::Difficulty;
use crate::session::ChatMode;

/// The pair of services a controller talks to
#[derive(Clone)]
pub struct Services {
    pub puzzle: Arc<dyn PuzzleService>,
    pub assistant: Arc<dyn AssistantService>,
}

impl Services {
    pub fn new(puzzle: Arc<dyn PuzzleService>, assistant: Arc<dyn AssistantService>) -> Self {
        Self { puzzle, assistant }
    }
}

/// Create HTTP-backed services from config
///
/// Both services share one client and base URL.
pub fn create_services(config: &ServiceConfig) -> Result<Services, ServiceError> {
    debug!(base_url = %config.base_url, "create_services: called");
    let client = Arc::new(HttpServiceClient::from_config(config)?);
    Ok(Services {
        puzzle: client.clone(),
        assistant: client,
    })
}

/// Difficulty labels from the service, or the built-in three
pub async fn difficulties_or_default(puzzle: &dyn PuzzleService) -> Vec<String> {
    debug!("difficulties_or_default: called");
    match puzzle.list_difficulties().await {
        Ok(levels) if !levels.is_empty() => levels,
        Ok(_) => {
            debug!("difficulties_or_default: empty list, using defaults");
            Difficulty::default_labels()
        }
        Err(e) => {
            warn!(error = %e, "difficulties_or_default: listing failed, using defaults");
            Difficulty::default_labels()
        }
    }
}

/// Model names from the service, or the configured models
pub async fn models_or_default(puzzle: &dyn PuzzleService, configured: &[String]) -> Vec<String> {
    debug!(configured = configured.len(), "models_or_default: called");
    match puzzle.list_models().await {
        Ok(models) if !models.is_empty() => models,
        result => {
            if let Err(e) = result {
                warn!(error = %e, "models_or_default: listing failed, using configured models");
            }
            let mut models: Vec<String> = Vec::new();
            for model in configured {
                if !models.contains(model) {
                    models.push(model.clone());
                }
            }
            models
        }
    }
}

/// Chat type labels from the assistant, or the built-in two
pub async fn chat_types_or_default(assistant: &dyn AssistantService) -> Vec<String> {
    debug!("chat_types_or_default: called");
    match assistant.list_chat_types().await {
        Ok(types) if !types.is_empty() => types,
        result => {
            if let Err(e) = result {
                warn!(error = %e, "chat_types_or_default: listing failed, using defaults");
            }
            ChatMode::default_labels()
        }
    }
}
