//! Session state
//!
//! The puzzle session (grids and placements) and the clue conversation state
//! machine. Both are plain values; the controller owns and serializes access.

mod clue_session;
mod puzzle;

pub use clue_session::{
    ChatMode, ChatTurn, ClueSession, EntryKind, FALLBACK_REPLY, HistoryPolicy, OutboundMessage, ReplyOutcome,
    ReplyTicket, SessionState, Speaker, TranscriptEntry, opener_text,
};
pub use puzzle::PuzzleSession;
