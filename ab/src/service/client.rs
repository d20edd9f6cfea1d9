//! PuzzleService and AssistantService trait definitions

use async_trait::async_trait;

use super::{GenerateCluesRequest, Layout, ReplyRequest, ServiceError};
use crate::domain::Clue;

/// Clue generation, grid layout and the lookup lists behind the menus
///
/// Each call is independent; the client keeps no session state.
#[async_trait]
pub trait PuzzleService: Send + Sync {
    /// Liveness probe; any failure reads as `false`
    async fn health_check(&self) -> bool;

    /// Produce clue/answer pairs for a topic string
    async fn generate_clues(&self, request: GenerateCluesRequest) -> Result<Vec<Clue>, ServiceError>;

    /// Arrange clues into a solution grid with placements
    async fn generate_layout(&self, clues: Vec<Clue>) -> Result<Layout, ServiceError>;

    async fn list_models(&self) -> Result<Vec<String>, ServiceError>;

    async fn list_difficulties(&self) -> Result<Vec<String>, ServiceError>;
}

/// Conversational assistant used for hints, deep dives and research chat
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// One reply for one message plus its history
    async fn reply(&self, request: ReplyRequest) -> Result<String, ServiceError>;

    async fn list_chat_types(&self) -> Result<Vec<String>, ServiceError>;
}
