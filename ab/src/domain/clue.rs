//! Clues, difficulty levels and topic input

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A clue and its answer, as exchanged with both services
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clue {
    pub clue: String,
    pub answer: String,
}

impl Clue {
    pub fn new(clue: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            clue: clue.into(),
            answer: answer.into(),
        }
    }

    /// Trimmed clue with an uppercase answer, or `None` if the answer is blank
    pub fn normalized(&self) -> Option<Self> {
        let answer = self.answer.trim().to_uppercase();
        if answer.is_empty() {
            return None;
        }
        Some(Self {
            clue: self.clue.trim().to_string(),
            answer,
        })
    }
}

/// Puzzle difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Label used on the wire and in menus
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Labels offered when the service cannot list its own
    pub fn default_labels() -> Vec<String> {
        Self::ALL.iter().map(|d| d.label().to_string()).collect()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown difficulty '{}'. Expected one of: Easy, Medium, Hard", s))
    }
}

/// Normalize a comma-separated topic list
///
/// Each topic is trimmed and empty entries are dropped. Returns `None` when
/// nothing is left.
pub fn normalize_topics(raw: &str) -> Option<String> {
    let topics: Vec<&str> = raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
    if topics.is_empty() { None } else { Some(topics.join(", ")) }
}
