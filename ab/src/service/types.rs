//! Wire types for the puzzle and assistant services

use serde::{Deserialize, Serialize};

use crate::domain::{Clue, Difficulty, Placement, WireCell};
use crate::session::ChatTurn;

/// Body of `POST /api/clues/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateCluesRequest {
    pub topic_str: String,
    pub difficulty: Difficulty,
    pub num_clues: usize,
    pub model: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CluesResponse {
    #[serde(default)]
    pub clues: Vec<Clue>,
}

/// Body of `POST /api/crossword/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateLayoutRequest<'a> {
    pub clues: &'a [Clue],
}

/// Layout service output: a solution grid and the words placed on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub grid: Vec<Vec<WireCell>>,
    #[serde(default)]
    pub placements: Vec<Placement>,
}

/// Body of `POST /api/chat/generate`
///
/// `clue` is `None` for the free-standing research chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    pub user_input: String,
    pub clue: Option<Clue>,
    pub chat_type: String,
    pub historical_messages: Vec<ChatTurn>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DifficultyLevelsResponse {
    #[serde(default)]
    pub difficulty_levels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatTypesResponse {
    #[serde(default)]
    pub chat_types: Vec<String>,
}
