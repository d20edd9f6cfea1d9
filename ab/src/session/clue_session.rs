//! Clue conversation state machine
//!
//! ```text
//! Idle ──select──▶ Opening ──reply──▶ Ready ──submit──▶ Awaiting
//!   ▲                 │                 ▲                   │
//!   └──── close ──────┴─── (any) ───────┴────── reply ──────┘
//! ```
//!
//! Selecting a clue or mode from any state clears the transcript and sends a
//! hidden opener. Each request carries a [`ReplyTicket`]; a reply whose ticket
//! no longer matches the live session is reported stale and not applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Placement;
use crate::error::SessionError;

/// Assistant text appended when a reply fails or comes back empty
pub const FALLBACK_REPLY: &str = "Failed to generate response. Please try again.";

/// Interaction mode for a clue conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatMode {
    #[default]
    Hint,
    DeepDive,
}

impl ChatMode {
    /// Chat type label understood by the assistant service
    pub fn label(self) -> &'static str {
        match self {
            ChatMode::Hint => "Get a Hint",
            ChatMode::DeepDive => "Deep Dive into the Answer",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [ChatMode::Hint, ChatMode::DeepDive]
            .into_iter()
            .find(|m| m.label() == label)
    }

    /// Short title for headers
    pub fn title(self) -> &'static str {
        match self {
            ChatMode::Hint => "Hint",
            ChatMode::DeepDive => "Deep Dive",
        }
    }

    /// Labels offered when the service cannot list its own
    pub fn default_labels() -> Vec<String> {
        vec![ChatMode::Hint.label().to_string(), ChatMode::DeepDive.label().to_string()]
    }
}

/// Hidden first message that seeds a conversation
pub fn opener_text(mode: ChatMode) -> &'static str {
    match mode {
        ChatMode::Hint => {
            "Give me an initial direction how to think about the clue. \
             Ask me what I know / think I know about this clue already."
        }
        ChatMode::DeepDive => {
            "Provide me a brief intellectual, academic overview of this topic. \
             Ask me if there's anything specific I want to know about this topic."
        }
    }
}

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// Whether an assistant entry is a real reply or the failure fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message,
    Fallback,
}

/// One visible line of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub kind: EntryKind,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    fn new(speaker: Speaker, text: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            speaker,
            text: text.into(),
            kind,
            at: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == EntryKind::Fallback
    }
}

/// One turn of history as the assistant service expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Speaker,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Speaker::Assistant,
            content: content.into(),
        }
    }
}

/// How much of the transcript is replayed to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicy {
    /// Replay the answered turns of the current session
    #[default]
    Transcript,
    /// Send every message without history
    None,
}

/// Conversation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Opener sent, reply in flight
    Opening,
    /// Waiting for user input
    Ready,
    /// User message sent, reply in flight
    Awaiting,
}

/// Identity of an in-flight request: the session epoch plus the
/// `(placement, mode)` pair active when it was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTicket {
    pub epoch: u64,
    pub placement: Placement,
    pub mode: ChatMode,
}

/// A request the session wants sent to the assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub ticket: ReplyTicket,
    pub input: String,
    pub history: Vec<ChatTurn>,
}

/// Result of applying a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Reply appended to the transcript
    Appended,
    /// Failure fallback appended to the transcript
    Fallback,
    /// Ticket no longer matches the live session; nothing changed
    Stale,
}

/// The single active clue conversation
#[derive(Debug, Clone, Default)]
pub struct ClueSession {
    active: Option<Placement>,
    mode: ChatMode,
    transcript: Vec<TranscriptEntry>,
    state: SessionState,
    epoch: u64,
}

impl ClueSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_clue(&self) -> Option<&Placement> {
        self.active.as_ref()
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while a reply is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self.state, SessionState::Opening | SessionState::Awaiting)
    }

    fn ticket(&self, placement: &Placement) -> ReplyTicket {
        ReplyTicket {
            epoch: self.epoch,
            placement: placement.clone(),
            mode: self.mode,
        }
    }

    /// Start a fresh conversation on `placement` in `mode`
    ///
    /// Always clears the transcript, even when re-selecting the same clue,
    /// and invalidates any reply still in flight for the previous session.
    pub fn select(&mut self, placement: Placement, mode: ChatMode) -> OutboundMessage {
        debug!(word = %placement.word, ?mode, from = ?self.state, "ClueSession::select: called");
        self.epoch += 1;
        self.transcript.clear();
        self.mode = mode;
        self.state = SessionState::Opening;
        let ticket = self.ticket(&placement);
        self.active = Some(placement);

        OutboundMessage {
            ticket,
            input: opener_text(mode).to_string(),
            history: Vec::new(),
        }
    }

    /// Record a user message and produce the request for it
    ///
    /// Only accepted in `Ready` with non-blank text. The user entry is
    /// appended before the reply arrives.
    pub fn submit(&mut self, text: &str, policy: HistoryPolicy) -> Result<OutboundMessage, SessionError> {
        debug!(state = ?self.state, ?policy, "ClueSession::submit: called");
        let message = text.trim();
        if message.is_empty() {
            return Err(SessionError::InvalidInput("message is blank".to_string()));
        }

        let placement = match (self.state, &self.active) {
            (SessionState::Ready, Some(placement)) => placement.clone(),
            (SessionState::Idle, _) | (_, None) => {
                return Err(SessionError::InvalidInput("no clue selected".to_string()));
            }
            (state, _) => {
                debug!(?state, "ClueSession::submit: reply still pending");
                return Err(SessionError::InvalidInput("a reply is still pending".to_string()));
            }
        };

        let history = match policy {
            HistoryPolicy::Transcript => self.history(),
            HistoryPolicy::None => Vec::new(),
        };

        self.transcript
            .push(TranscriptEntry::new(Speaker::User, message, EntryKind::Message));
        self.state = SessionState::Awaiting;

        Ok(OutboundMessage {
            ticket: self.ticket(&placement),
            input: message.to_string(),
            history,
        })
    }

    /// Apply the reply for `ticket`
    ///
    /// `reply` is `None` (or blank) when the request failed; the fallback
    /// text is appended instead. Either way the session returns to `Ready`.
    pub fn apply_reply(&mut self, ticket: &ReplyTicket, reply: Option<&str>) -> ReplyOutcome {
        debug!(ticket_epoch = ticket.epoch, epoch = self.epoch, state = ?self.state, "ClueSession::apply_reply: called");
        if ticket.epoch != self.epoch || !self.is_pending() {
            debug!("ClueSession::apply_reply: stale ticket");
            return ReplyOutcome::Stale;
        }

        self.state = SessionState::Ready;
        match reply.map(str::trim).filter(|r| !r.is_empty()) {
            Some(text) => {
                self.transcript
                    .push(TranscriptEntry::new(Speaker::Assistant, text, EntryKind::Message));
                ReplyOutcome::Appended
            }
            None => {
                self.transcript
                    .push(TranscriptEntry::new(Speaker::Assistant, FALLBACK_REPLY, EntryKind::Fallback));
                ReplyOutcome::Fallback
            }
        }
    }

    /// Discard the conversation and return to `Idle`
    pub fn close(&mut self) {
        debug!(state = ?self.state, "ClueSession::close: called");
        self.epoch += 1;
        self.active = None;
        self.transcript.clear();
        self.state = SessionState::Idle;
    }

    /// Answered turns of this session, ready to replay as context
    ///
    /// The opener is restored as the leading user turn when its reply
    /// succeeded. Fallback entries are dropped together with the user message
    /// they answered, so the result always alternates user/assistant.
    pub fn history(&self) -> Vec<ChatTurn> {
        let mut turns: Vec<ChatTurn> = Vec::new();

        if let Some(first) = self.transcript.first()
            && first.speaker == Speaker::Assistant
            && !first.is_fallback()
        {
            turns.push(ChatTurn::user(opener_text(self.mode)));
        }

        for entry in &self.transcript {
            if entry.is_fallback() {
                if turns.last().is_some_and(|t| t.role == Speaker::User) {
                    turns.pop();
                }
                continue;
            }
            turns.push(ChatTurn {
                role: entry.speaker,
                content: entry.text.clone(),
            });
        }

        turns
    }
}
