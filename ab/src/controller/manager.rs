//! SessionController - actor that owns the puzzle and clue sessions
//!
//! Every mutation goes through one command channel, so grid replacement and
//! clue session transitions are serialized by construction. Service calls run
//! in spawned tasks and report back as completion commands, which the actor
//! checks against the current generation counter or reply ticket before
//! applying.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Grid, Placement, normalize_topics};
use crate::error::SessionError;
use crate::service::{
    GenerateCluesRequest, ReplyRequest, ServiceError, Services, chat_types_or_default, difficulties_or_default,
    models_or_default,
};
use crate::session::{
    ChatMode, ClueSession, HistoryPolicy, OutboundMessage, PuzzleSession, ReplyOutcome, ReplyTicket,
};

use super::messages::{
    ChatOutcome, ControllerCommand, ControllerResponse, EditOutcome, GenerateRequest, PendingGeneration, PendingReply,
    PuzzleSummary, SessionEvent, SessionSnapshot,
};

/// Settings the controller applies to every clue conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub chat_model: String,
    pub history: HistoryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let chat = crate::config::ChatConfig::default();
        Self {
            chat_model: chat.model,
            history: chat.history,
        }
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            chat_model: config.chat.model.clone(),
            history: config.chat.history,
        }
    }
}

/// Handle to send commands to the SessionController
#[derive(Clone)]
pub struct SessionController {
    tx: mpsc::Sender<ControllerCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    services: Services,
}

impl SessionController {
    /// Spawn a new SessionController actor
    pub fn spawn(services: Services, config: ControllerConfig) -> Self {
        debug!(?config, "spawn: called");
        let (tx, rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);

        let state = ControllerState {
            services: services.clone(),
            config,
            completions: tx.downgrade(),
            event_tx: event_tx.clone(),
            puzzle: None,
            clue: ClueSession::new(),
            generation: 0,
            pending_generation: None,
            pending_reply: None,
            last_error: None,
        };
        tokio::spawn(actor_loop(state, rx));

        info!("SessionController spawned");
        Self { tx, event_tx, services }
    }

    /// Probe the service, then spawn
    ///
    /// A failed probe creates no session state.
    pub async fn connect(services: Services, config: ControllerConfig) -> ControllerResponse<Self> {
        debug!("connect: called");
        if !services.puzzle.health_check().await {
            warn!("connect: health check failed");
            return Err(SessionError::ServiceUnavailable(
                "the puzzle service did not pass its health check".to_string(),
            ));
        }
        Ok(Self::spawn(services, config))
    }

    /// Subscribe to state change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerCommand,
    ) -> ControllerResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)
    }

    /// Start generating a puzzle
    ///
    /// The current puzzle and clue session are cleared before this returns.
    /// Blank topics are rejected without touching state.
    pub async fn generate(&self, request: GenerateRequest) -> ControllerResponse<PendingGeneration> {
        debug!(topics = %request.topics, difficulty = %request.difficulty, count = request.clue_count, "generate: called");
        self.request(|reply| ControllerCommand::Generate { request, reply })
            .await?
    }

    /// Write `value` into the answer overlay
    pub async fn edit_cell(&self, row: usize, col: usize, value: &str) -> ControllerResponse<EditOutcome> {
        debug!(row, col, %value, "edit_cell: called");
        let value = value.to_string();
        self.request(|reply| ControllerCommand::EditCell { row, col, value, reply })
            .await?
    }

    /// Toggle reveal mode; `false` when there is no puzzle to reveal
    pub async fn set_reveal(&self, reveal: bool) -> ControllerResponse<bool> {
        debug!(reveal, "set_reveal: called");
        self.request(|reply| ControllerCommand::SetReveal { reveal, reply }).await
    }

    /// Open a fresh conversation on `placement`
    pub async fn select_clue(&self, placement: Placement, mode: ChatMode) -> ControllerResponse<PendingReply> {
        debug!(word = %placement.word, ?mode, "select_clue: called");
        self.request(|reply| ControllerCommand::SelectClue { placement, mode, reply })
            .await?
    }

    /// Send a message in the active conversation
    ///
    /// `Ok(None)` when no clue is active.
    pub async fn send_message(&self, text: &str) -> ControllerResponse<Option<PendingReply>> {
        debug!(len = text.len(), "send_message: called");
        let text = text.to_string();
        self.request(|reply| ControllerCommand::SendMessage { text, reply })
            .await?
    }

    pub async fn close_clue(&self) -> ControllerResponse<()> {
        debug!("close_clue: called");
        self.request(|reply| ControllerCommand::CloseClue { reply }).await
    }

    pub async fn snapshot(&self) -> ControllerResponse<SessionSnapshot> {
        debug!("snapshot: called");
        self.request(|reply| ControllerCommand::Snapshot { reply }).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> ControllerResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(ControllerCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }

    // === Lookup lists (fall back when the service cannot answer) ===

    pub async fn list_difficulties(&self) -> Vec<String> {
        difficulties_or_default(self.services.puzzle.as_ref()).await
    }

    pub async fn list_models(&self, configured: &[String]) -> Vec<String> {
        models_or_default(self.services.puzzle.as_ref(), configured).await
    }

    pub async fn list_chat_types(&self) -> Vec<String> {
        chat_types_or_default(self.services.assistant.as_ref()).await
    }
}

/// State owned by the actor task
struct ControllerState {
    services: Services,
    config: ControllerConfig,
    /// Spawned service calls report back here; weak so dropping every
    /// handle still stops the actor
    completions: mpsc::WeakSender<ControllerCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    puzzle: Option<PuzzleSession>,
    clue: ClueSession,
    generation: u64,
    pending_generation: Option<(u64, oneshot::Sender<ControllerResponse<PuzzleSummary>>)>,
    pending_reply: Option<(ReplyTicket, oneshot::Sender<ChatOutcome>)>,
    last_error: Option<SessionError>,
}

impl ControllerState {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn handle_generate(&mut self, request: GenerateRequest) -> ControllerResponse<PendingGeneration> {
        debug!(generation = self.generation, "handle_generate: called");
        let Some(topics) = normalize_topics(&request.topics) else {
            return Err(SessionError::InvalidInput("topics are blank".to_string()));
        };
        if request.clue_count == 0 {
            return Err(SessionError::InvalidInput("clue count must be at least 1".to_string()));
        }

        self.generation += 1;
        let generation = self.generation;

        if let Some((old, reply)) = self.pending_generation.take() {
            info!(old, generation, "handle_generate: superseding generation in flight");
            let _ = reply.send(Err(SessionError::Superseded));
        }

        self.clear_puzzle();

        let (tx, rx) = oneshot::channel();
        self.pending_generation = Some((generation, tx));

        let puzzle = self.services.puzzle.clone();
        let clue_request = GenerateCluesRequest {
            topic_str: topics,
            difficulty: request.difficulty,
            num_clues: request.clue_count,
            model: request.clue_model,
        };
        let done = self.completions.clone();
        tokio::spawn(async move {
            let result = run_generation(puzzle.as_ref(), clue_request).await;
            report(done, ControllerCommand::GenerationFinished { generation, result }).await;
        });

        Ok(PendingGeneration { generation, rx })
    }

    /// Drop the puzzle and any clue conversation on it
    fn clear_puzzle(&mut self) {
        debug!(had_puzzle = self.puzzle.is_some(), "clear_puzzle: called");
        self.close_clue();
        self.puzzle = None;
        self.last_error = None;
        self.emit(SessionEvent::PuzzleCleared);
    }

    fn handle_generation_finished(&mut self, generation: u64, result: ControllerResponse<PuzzleSession>) {
        debug!(generation, current = self.generation, "handle_generation_finished: called");
        if generation != self.generation {
            info!(generation, current = self.generation, "handle_generation_finished: dropping superseded result");
            return;
        }
        let Some((_, reply)) = self.pending_generation.take() else {
            debug!("handle_generation_finished: nothing pending");
            return;
        };

        match result {
            Ok(puzzle) => {
                let summary = PuzzleSummary::of(&puzzle, generation);
                info!(id = %summary.id, rows = summary.rows, cols = summary.cols, "Puzzle ready");
                self.puzzle = Some(puzzle);
                self.emit(SessionEvent::PuzzleReady(summary));
                let _ = reply.send(Ok(summary));
            }
            Err(error) => {
                warn!(generation, %error, "Generation failed");
                self.last_error = Some(error.clone());
                self.emit(SessionEvent::GenerationFailed {
                    generation,
                    error: error.clone(),
                });
                let _ = reply.send(Err(error));
            }
        }
    }

    fn handle_edit_cell(&mut self, row: usize, col: usize, value: &str) -> ControllerResponse<EditOutcome> {
        let Some(puzzle) = self.puzzle.as_mut() else {
            debug!("handle_edit_cell: no puzzle");
            return Ok(EditOutcome::Ignored);
        };
        if puzzle.reveal() {
            debug!("handle_edit_cell: answers revealed");
            return Ok(EditOutcome::Ignored);
        }

        puzzle
            .edit(row, col, value)
            .map_err(|e| SessionError::InvalidInput(e.to_string()))?;
        self.emit(SessionEvent::CellChanged { row, col });
        Ok(EditOutcome::Applied)
    }

    fn handle_set_reveal(&mut self, reveal: bool) -> bool {
        let Some(puzzle) = self.puzzle.as_mut() else {
            debug!("handle_set_reveal: no puzzle");
            return false;
        };
        puzzle.set_reveal(reveal);
        self.emit(SessionEvent::RevealChanged(reveal));
        true
    }

    fn handle_select_clue(&mut self, placement: Placement, mode: ChatMode) -> ControllerResponse<PendingReply> {
        let known = self
            .puzzle
            .as_ref()
            .is_some_and(|p| p.placements().contains(&placement));
        if !known {
            return Err(SessionError::InvalidInput(format!(
                "'{}' is not a clue in the current puzzle",
                placement.clue
            )));
        }

        self.discard_pending_reply();
        let outbound = self.clue.select(placement.clone(), mode);
        self.emit(SessionEvent::ClueOpened { placement, mode });
        Ok(self.dispatch(outbound))
    }

    fn handle_send_message(&mut self, text: &str) -> ControllerResponse<Option<PendingReply>> {
        if self.clue.active_clue().is_none() {
            debug!("handle_send_message: no active clue");
            return Ok(None);
        }

        let outbound = self.clue.submit(text, self.config.history)?;
        self.emit(SessionEvent::TranscriptUpdated {
            len: self.clue.transcript().len(),
        });
        Ok(Some(self.dispatch(outbound)))
    }

    /// Issue the assistant request for `outbound` in the background
    fn dispatch(&mut self, outbound: OutboundMessage) -> PendingReply {
        let OutboundMessage { ticket, input, history } = outbound;
        debug!(epoch = ticket.epoch, history = history.len(), "dispatch: called");

        let request = ReplyRequest {
            user_input: input,
            clue: Some(ticket.placement.to_clue()),
            chat_type: ticket.mode.label().to_string(),
            historical_messages: history,
            model: self.config.chat_model.clone(),
        };

        let (tx, rx) = oneshot::channel();
        self.pending_reply = Some((ticket.clone(), tx));

        let assistant = self.services.assistant.clone();
        let done = self.completions.clone();
        let task_ticket = ticket.clone();
        tokio::spawn(async move {
            let result = assistant.reply(request).await;
            report(done, ControllerCommand::ReplyArrived {
                ticket: task_ticket,
                result,
            })
            .await;
        });

        PendingReply { ticket, rx }
    }

    fn handle_reply_arrived(&mut self, ticket: ReplyTicket, result: Result<String, ServiceError>) {
        debug!(epoch = ticket.epoch, ok = result.is_ok(), "handle_reply_arrived: called");
        let failure = match &result {
            Ok(text) if text.trim().is_empty() => Some("assistant returned an empty reply".to_string()),
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
        let reply = result.ok();

        match self.clue.apply_reply(&ticket, reply.as_deref()) {
            ReplyOutcome::Stale => {
                info!(epoch = ticket.epoch, word = %ticket.placement.word, "Dropping reply for a closed or switched clue");
                self.emit(SessionEvent::ReplyDiscarded {
                    placement: ticket.placement,
                    mode: ticket.mode,
                });
                return;
            }
            ReplyOutcome::Appended | ReplyOutcome::Fallback => {}
        }

        self.emit(SessionEvent::TranscriptUpdated {
            len: self.clue.transcript().len(),
        });

        let outcome = match failure {
            Some(message) => {
                warn!(word = %ticket.placement.word, %message, "Chat reply failed");
                ChatOutcome::Fallback(SessionError::ChatFailure(message))
            }
            None => ChatOutcome::Reply(reply.map(|r| r.trim().to_string()).unwrap_or_default()),
        };

        if let Some((pending, tx)) = self.pending_reply.take() {
            if pending == ticket {
                let _ = tx.send(outcome);
            } else {
                self.pending_reply = Some((pending, tx));
            }
        }
    }

    /// Resolve the reply in flight as discarded
    fn discard_pending_reply(&mut self) {
        if let Some((ticket, tx)) = self.pending_reply.take() {
            debug!(epoch = ticket.epoch, "discard_pending_reply: discarding");
            let _ = tx.send(ChatOutcome::Discarded);
        }
    }

    fn close_clue(&mut self) {
        self.discard_pending_reply();
        if self.clue.active_clue().is_some() {
            self.clue.close();
            self.emit(SessionEvent::ClueClosed);
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            puzzle: self.puzzle.clone(),
            clue: self.clue.clone(),
            generation: self.generation,
            generating: self.pending_generation.is_some(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Send a completion back to the actor, if it is still running
async fn report(completions: mpsc::WeakSender<ControllerCommand>, command: ControllerCommand) {
    let Some(tx) = completions.upgrade() else {
        debug!("report: actor gone");
        return;
    };
    if tx.send(command).await.is_err() {
        debug!("report: actor stopped before completion arrived");
    }
}

/// Clues, then layout, then a validated puzzle
///
/// Every service failure becomes a [`SessionError`] here.
async fn run_generation(
    puzzle: &dyn crate::service::PuzzleService,
    request: GenerateCluesRequest,
) -> ControllerResponse<PuzzleSession> {
    debug!(topic = %request.topic_str, "run_generation: called");
    let clues = puzzle
        .generate_clues(request)
        .await
        .map_err(|e| SessionError::GenerationFailure(format!("clue request failed: {}", e)))?;

    let clues: Vec<_> = clues.iter().filter_map(|c| c.normalized()).collect();
    if clues.is_empty() {
        return Err(SessionError::GenerationFailure("no clues were returned".to_string()));
    }
    debug!(count = clues.len(), "run_generation: requesting layout");

    let layout = puzzle
        .generate_layout(clues)
        .await
        .map_err(|e| SessionError::GenerationFailure(format!("layout request failed: {}", e)))?;

    if layout.placements.is_empty() {
        return Err(SessionError::GenerationFailure("layout placed no words".to_string()));
    }
    let grid = Grid::from_wire(&layout.grid)
        .map_err(|e| SessionError::GenerationFailure(format!("layout grid is invalid: {}", e)))?;

    Ok(PuzzleSession::build(grid, layout.placements)?)
}

/// Main actor loop
async fn actor_loop(mut state: ControllerState, mut rx: mpsc::Receiver<ControllerCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            ControllerCommand::Generate { request, reply } => {
                debug!("actor_loop: Generate command");
                let _ = reply.send(state.handle_generate(request));
            }

            ControllerCommand::EditCell { row, col, value, reply } => {
                debug!(row, col, "actor_loop: EditCell command");
                let _ = reply.send(state.handle_edit_cell(row, col, &value));
            }

            ControllerCommand::SetReveal { reveal, reply } => {
                debug!(reveal, "actor_loop: SetReveal command");
                let _ = reply.send(state.handle_set_reveal(reveal));
            }

            ControllerCommand::SelectClue { placement, mode, reply } => {
                debug!(word = %placement.word, ?mode, "actor_loop: SelectClue command");
                let _ = reply.send(state.handle_select_clue(placement, mode));
            }

            ControllerCommand::SendMessage { text, reply } => {
                debug!("actor_loop: SendMessage command");
                let _ = reply.send(state.handle_send_message(&text));
            }

            ControllerCommand::CloseClue { reply } => {
                debug!("actor_loop: CloseClue command");
                state.close_clue();
                let _ = reply.send(());
            }

            ControllerCommand::Snapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }

            ControllerCommand::GenerationFinished { generation, result } => {
                debug!(generation, "actor_loop: GenerationFinished command");
                state.handle_generation_finished(generation, result);
            }

            ControllerCommand::ReplyArrived { ticket, result } => {
                debug!(epoch = ticket.epoch, "actor_loop: ReplyArrived command");
                state.handle_reply_arrived(ticket, result);
            }

            ControllerCommand::Shutdown => {
                info!("SessionController shutting down");
                break;
            }
        }
    }

    debug!("actor_loop: exited");
}
