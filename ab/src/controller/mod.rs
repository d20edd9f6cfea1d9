//! Session control with actor pattern
//!
//! SessionController owns the puzzle session and the clue conversation and
//! processes messages via channels, so every mutation is serialized and late
//! service results can be fenced off.

mod manager;
mod messages;

pub use manager::{ControllerConfig, SessionController};
pub use messages::{
    ChatOutcome, ControllerCommand, ControllerResponse, EditOutcome, GenerateRequest, PendingGeneration, PendingReply,
    PuzzleSummary, SessionEvent, SessionSnapshot,
};
