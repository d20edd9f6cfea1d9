//! Session controller messages
//!
//! Commands, outcomes and events for the actor pattern.

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Difficulty, Placement};
use crate::error::SessionError;
use crate::service::ServiceError;
use crate::session::{ChatMode, ClueSession, PuzzleSession, ReplyTicket};

/// Response from controller operations
pub type ControllerResponse<T> = Result<T, SessionError>;

/// Parameters for one puzzle generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Comma-separated topic list
    pub topics: String,
    pub difficulty: Difficulty,
    pub clue_model: String,
    pub clue_count: usize,
}

/// Shape of a freshly published puzzle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuzzleSummary {
    pub id: Uuid,
    pub generation: u64,
    pub rows: usize,
    pub cols: usize,
    pub across: usize,
    pub down: usize,
}

impl PuzzleSummary {
    pub(crate) fn of(puzzle: &PuzzleSession, generation: u64) -> Self {
        let (rows, cols) = puzzle.solution().dimensions();
        Self {
            id: puzzle.id(),
            generation,
            rows,
            cols,
            across: puzzle.placements().across().len(),
            down: puzzle.placements().down().len(),
        }
    }
}

/// A generation in flight
///
/// Resolves with the new puzzle, the failure that cleared it, or
/// [`SessionError::Superseded`] once a newer generation starts.
#[derive(Debug)]
pub struct PendingGeneration {
    pub generation: u64,
    pub(crate) rx: oneshot::Receiver<ControllerResponse<PuzzleSummary>>,
}

impl PendingGeneration {
    pub async fn wait(self) -> ControllerResponse<PuzzleSummary> {
        debug!(generation = self.generation, "PendingGeneration::wait: called");
        self.rx.await.map_err(|_| SessionError::ChannelError)?
    }
}

/// How a clue conversation request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Reply appended to the transcript
    Reply(String),
    /// Request failed; the fallback message was appended instead
    Fallback(SessionError),
    /// Session was switched or closed before the reply arrived
    Discarded,
}

/// A clue conversation request in flight
#[derive(Debug)]
pub struct PendingReply {
    pub ticket: ReplyTicket,
    pub(crate) rx: oneshot::Receiver<ChatOutcome>,
}

impl PendingReply {
    pub async fn wait(self) -> ChatOutcome {
        debug!(epoch = self.ticket.epoch, "PendingReply::wait: called");
        self.rx.await.unwrap_or(ChatOutcome::Discarded)
    }
}

/// Result of a cell edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// No puzzle, or answers are revealed
    Ignored,
}

/// Point-in-time copy of the controller's state
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub puzzle: Option<PuzzleSession>,
    pub clue: ClueSession,
    pub generation: u64,
    pub generating: bool,
    pub last_error: Option<SessionError>,
}

/// Broadcast after each state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PuzzleCleared,
    PuzzleReady(PuzzleSummary),
    GenerationFailed { generation: u64, error: SessionError },
    CellChanged { row: usize, col: usize },
    RevealChanged(bool),
    ClueOpened { placement: Placement, mode: ChatMode },
    ClueClosed,
    TranscriptUpdated { len: usize },
    /// A reply arrived for a session that is no longer current
    ReplyDiscarded { placement: Placement, mode: ChatMode },
}

/// Commands sent to the controller actor
#[derive(Debug)]
pub enum ControllerCommand {
    Generate {
        request: GenerateRequest,
        reply: oneshot::Sender<ControllerResponse<PendingGeneration>>,
    },
    EditCell {
        row: usize,
        col: usize,
        value: String,
        reply: oneshot::Sender<ControllerResponse<EditOutcome>>,
    },
    SetReveal {
        reveal: bool,
        reply: oneshot::Sender<bool>,
    },
    SelectClue {
        placement: Placement,
        mode: ChatMode,
        reply: oneshot::Sender<ControllerResponse<PendingReply>>,
    },
    SendMessage {
        text: String,
        reply: oneshot::Sender<ControllerResponse<Option<PendingReply>>>,
    },
    CloseClue {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },

    // Completions from spawned service calls
    GenerationFinished {
        generation: u64,
        result: ControllerResponse<PuzzleSession>,
    },
    ReplyArrived {
        ticket: ReplyTicket,
        result: Result<String, ServiceError>,
    },

    Shutdown,
}
