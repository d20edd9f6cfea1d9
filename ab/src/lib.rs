//! Across the Board - topic-driven crossword client
//!
//! Turns a list of topics into a crossword through an external generation
//! service, then lets the solver open a hint or deep-dive conversation per
//! clue through an external assistant service.
//!
//! # Core Concepts
//!
//! - **Solution vs. overlay**: the generated grid never changes; the user's
//!   answers live in a second grid of the same shape
//! - **Placements bind clues to cells**: every placement must read back its
//!   own word from the solution grid, or the puzzle is rejected
//! - **One clue session at a time**: selecting a clue or mode always starts a
//!   fresh transcript seeded by a hidden opener
//! - **Fencing**: late replies and superseded generations are dropped, never
//!   applied to newer state
//!
//! # Modules
//!
//! - [`domain`] - grid, placements, clues
//! - [`session`] - puzzle session and clue conversation state machine
//! - [`controller`] - actor that owns all mutable state
//! - [`service`] - generation/assistant service traits and HTTP client
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`repl`] - interactive terminal front-end

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod repl;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use config::{ChatConfig, Config, GenerationConfig, ServiceConfig};
pub use controller::{
    ChatOutcome, ControllerConfig, EditOutcome, GenerateRequest, PendingGeneration, PendingReply, PuzzleSummary,
    SessionController, SessionEvent, SessionSnapshot,
};
pub use domain::{
    Cell, Clue, Difficulty, Direction, Grid, GridError, GridView, MalformedPlacementError, Placement, PlacementIndex,
    build_answer_grid, normalize_topics, resolve_display_text, set_cell,
};
pub use error::SessionError;
pub use service::{AssistantService, HttpServiceClient, PuzzleService, ServiceError, Services, create_services};
pub use session::{
    ChatMode, ChatTurn, ClueSession, HistoryPolicy, PuzzleSession, ReplyTicket, SessionState, Speaker,
    TranscriptEntry, opener_text,
};
