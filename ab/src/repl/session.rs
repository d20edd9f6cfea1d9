//! REPL session management
//!
//! The prompt stays live while the services work: generation and replies are
//! awaited in spawned tasks that print above the prompt when they land.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use colored::Colorize;
use eyre::Result;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};
use tracing::debug;

use super::render::{parse_clue_ref, render_clues, render_grid};
use crate::config::Config;
use crate::controller::{
    ChatOutcome, ControllerResponse, EditOutcome, GenerateRequest, PendingGeneration, PendingReply, PuzzleSummary,
    SessionController,
};
use crate::domain::Difficulty;
use crate::error::SessionError;
use crate::session::{ChatMode, FALLBACK_REPLY, PuzzleSession, Speaker};

/// Writes output above the prompt while readline waits for input
///
/// Falls back to stdout when the terminal has no external printer.
#[derive(Clone)]
struct Output {
    printer: Option<Arc<Mutex<Box<dyn ExternalPrinter + Send>>>>,
}

impl Output {
    fn new(rl: &mut DefaultEditor) -> Self {
        let printer = match rl.create_external_printer() {
            Ok(printer) => {
                let printer: Box<dyn ExternalPrinter + Send> = Box::new(printer);
                Some(Arc::new(Mutex::new(printer)))
            }
            Err(e) => {
                debug!(error = %e, "Output::new: no external printer, using stdout");
                None
            }
        };
        Self { printer }
    }

    fn print(&self, text: String) {
        if let Some(printer) = &self.printer
            && let Ok(mut printer) = printer.lock()
            && printer.print(text.clone()).is_ok()
        {
            return;
        }
        print!("{}", text);
        let _ = io::stdout().flush();
    }
}

/// Interactive puzzle session
pub struct ReplSession {
    controller: SessionController,
    config: Config,
    difficulty: Difficulty,
    clue_count: usize,
    clue_model: String,
}

impl ReplSession {
    /// Create a new REPL session on a connected controller
    pub fn new(controller: SessionController, config: Config) -> Self {
        debug!("ReplSession::new: called");
        Self {
            controller,
            difficulty: config.generation.difficulty,
            clue_count: config.generation.clue_count,
            clue_model: config.generation.clue_model.clone(),
            config,
        }
    }

    /// Run the REPL main loop
    ///
    /// Needs the multi-threaded runtime: readline blocks its worker while
    /// spawned waits keep running on the others.
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        let output = Output::new(&mut rl);
        let prompt = format!("{} ", ">".bright_green());

        loop {
            let readline = tokio::task::block_in_place(|| rl.readline(&prompt));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input, &output).await? {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.chat(input, &output).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.controller.shutdown().await?;
        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "AcrossBoard".bright_cyan().bold());
        println!("Service: {}", self.config.service.base_url);
        println!(
            "Start a puzzle with {}, type {} for help, {} to quit",
            "/new <topics>".yellow(),
            "/help".yellow(),
            "/quit".yellow()
        );
        println!();
    }

    /// Handle slash commands
    async fn handle_slash_command(&mut self, input: &str, output: &Output) -> Result<SlashResult> {
        debug!(%input, "handle_slash_command: called");
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return Ok(SlashResult::Quit),
            "/new" => self.new_puzzle(rest, output).await,
            "/difficulty" => match rest.parse::<Difficulty>() {
                Ok(difficulty) => {
                    self.difficulty = difficulty;
                    println!("Difficulty set to {}", difficulty.to_string().bright_white());
                }
                Err(_) if rest.is_empty() => {
                    println!("Current difficulty: {}", self.difficulty.to_string().bright_white());
                    self.print_list("Difficulty Levels", self.controller.list_difficulties().await);
                }
                Err(e) => println!("{} {}", "Error:".red(), e),
            },
            "/count" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => {
                    self.clue_count = n;
                    println!("Clue count set to {}", n.to_string().bright_white());
                }
                _ => println!("{} /count needs a positive number", "Error:".red()),
            },
            "/model" => {
                if rest.is_empty() {
                    println!("Current clue model: {}", self.clue_model.bright_white());
                } else {
                    self.clue_model = rest.to_string();
                    println!("Clue model set to {}", self.clue_model.bright_white());
                }
            }
            "/models" => {
                let models = self.controller.list_models(&self.config.known_models()).await;
                self.print_list("Models", models);
            }
            "/difficulties" => {
                let levels = self.controller.list_difficulties().await;
                self.print_list("Difficulty Levels", levels);
            }
            "/grid" => self.print_puzzle(false).await?,
            "/clues" => self.print_puzzle(true).await?,
            "/set" => self.set_cell(&args).await?,
            "/reveal" => self.toggle_reveal().await?,
            "/hint" => self.open_clue(rest, ChatMode::Hint, output).await?,
            "/dive" => self.open_clue(rest, ChatMode::DeepDive, output).await?,
            "/close" => {
                self.controller.close_clue().await?;
                println!("{}", "Clue session closed.".dimmed());
            }
            "/transcript" => self.print_transcript().await?,
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }

        Ok(SlashResult::Continue)
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Puzzle:".bright_cyan());
        println!("  {:14} Generate a puzzle from comma-separated topics", "/new".yellow());
        println!("  {:14} Set or show difficulty", "/difficulty".yellow());
        println!("  {:14} Set number of clues", "/count".yellow());
        println!("  {:14} Set or show the clue model", "/model".yellow());
        println!("  {:14} Show the grid", "/grid".yellow());
        println!("  {:14} Show the clue list", "/clues".yellow());
        println!("  {:14} Fill a cell: /set <row> <col> [letter]", "/set".yellow());
        println!("  {:14} Toggle showing answers", "/reveal".yellow());
        println!();
        println!("{}", "Clue chat:".bright_cyan());
        println!("  {:14} Get a hint, e.g. /hint a1", "/hint".yellow());
        println!("  {:14} Deep dive into an answer, e.g. /dive d2", "/dive".yellow());
        println!("  {:14} Close the clue session", "/close".yellow());
        println!("  {:14} Show the conversation", "/transcript".yellow());
        println!("  {:14} Any other line is sent to the open clue", "<text>".yellow());
        println!();
        println!("{}", "Service:".bright_cyan());
        println!("  {:14} List available models", "/models".yellow());
        println!("  {:14} List difficulty levels", "/difficulties".yellow());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit", "/quit".yellow());
        println!();
    }

    fn print_list(&self, title: &str, items: Vec<String>) {
        println!("{}", format!("{}:", title).bright_cyan());
        for item in items {
            println!("  {}", item);
        }
    }

    /// Start a generation and return to the prompt; the result prints when it lands
    async fn new_puzzle(&mut self, topics: &str, output: &Output) {
        let request = GenerateRequest {
            topics: topics.to_string(),
            difficulty: self.difficulty,
            clue_model: self.clue_model.clone(),
            clue_count: self.clue_count,
        };

        let pending = match self.controller.generate(request).await {
            Ok(pending) => pending,
            Err(e) => {
                println!("{} {}", "Error:".red(), e);
                return;
            }
        };

        println!(
            "{}",
            format!("Generating {} {} clues...", self.clue_count, self.difficulty).dimmed()
        );
        tokio::spawn(report_generation(self.controller.clone(), pending, output.clone()));
    }

    async fn print_puzzle(&self, clues: bool) -> Result<()> {
        let snapshot = self.controller.snapshot().await?;
        match snapshot.puzzle {
            Some(puzzle) if clues => println!("{}", render_clues(puzzle.placements(), puzzle.reveal())),
            Some(puzzle) => print!("{}", grid_text(&puzzle)),
            None if snapshot.generating => println!("{}", "Still generating...".dimmed()),
            None => println!("{}", "No puzzle yet. Use /new <topics>.".dimmed()),
        }
        Ok(())
    }

    async fn set_cell(&self, args: &[&str]) -> Result<()> {
        let parsed = match args {
            [row, col] => row.parse::<usize>().ok().zip(col.parse::<usize>().ok()).map(|rc| (rc, "")),
            [row, col, value] => row.parse::<usize>().ok().zip(col.parse::<usize>().ok()).map(|rc| (rc, *value)),
            _ => None,
        };
        let Some(((row, col), value)) = parsed else {
            println!("{} usage: /set <row> <col> [letter]", "Error:".red());
            return Ok(());
        };

        match self.controller.edit_cell(row, col, value).await {
            Ok(EditOutcome::Applied) => self.print_puzzle(false).await?,
            Ok(EditOutcome::Ignored) => println!("{}", "Edit ignored (no puzzle, or answers are shown).".dimmed()),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        Ok(())
    }

    async fn toggle_reveal(&self) -> Result<()> {
        let snapshot = self.controller.snapshot().await?;
        let Some(puzzle) = snapshot.puzzle else {
            println!("{}", "No puzzle yet. Use /new <topics>.".dimmed());
            return Ok(());
        };
        self.controller.set_reveal(!puzzle.reveal()).await?;
        self.print_puzzle(false).await?;
        self.print_puzzle(true).await
    }

    async fn open_clue(&self, reference: &str, mode: ChatMode, output: &Output) -> Result<()> {
        let Some((direction, number)) = parse_clue_ref(reference) else {
            println!("{} pick a clue like a1 or d2", "Error:".red());
            return Ok(());
        };
        let snapshot = self.controller.snapshot().await?;
        let placement = snapshot
            .puzzle
            .as_ref()
            .and_then(|p| p.placements().get(direction, number))
            .cloned();
        let Some(placement) = placement else {
            println!("{} no clue {}", "Error:".red(), reference);
            return Ok(());
        };

        println!();
        println!(
            "{} {}",
            format!("[{}]", mode.title()).bright_magenta(),
            placement.clue.bright_white()
        );
        match self.controller.select_clue(placement, mode).await {
            Ok(pending) => spawn_reply(pending, output),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        Ok(())
    }

    /// Send a plain line to the open clue session
    async fn chat(&self, text: &str, output: &Output) -> Result<()> {
        match self.controller.send_message(text).await {
            Ok(Some(pending)) => spawn_reply(pending, output),
            Ok(None) => println!(
                "{}",
                "No clue selected. Use /hint <a1> or /dive <d2> first.".dimmed()
            ),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        Ok(())
    }

    async fn print_transcript(&self) -> Result<()> {
        let clue = self.controller.snapshot().await?.clue;
        let Some(placement) = clue.active_clue() else {
            println!("{}", "No clue session open.".dimmed());
            return Ok(());
        };

        println!();
        println!(
            "{} {}",
            format!("[{}]", clue.mode().title()).bright_magenta(),
            placement.clue.bright_white()
        );
        for entry in clue.transcript() {
            let speaker = match entry.speaker {
                Speaker::User => "You:".bright_green(),
                Speaker::Assistant => "Assistant:".bright_blue(),
            };
            println!("  {} {} {}", entry.at.format("%H:%M:%S").to_string().dimmed(), speaker, entry.text);
        }
        if clue.is_pending() {
            println!("  {}", "(waiting for reply)".dimmed());
        }
        println!();
        Ok(())
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

fn spawn_reply(pending: PendingReply, output: &Output) {
    println!("{}", "...".dimmed());
    let output = output.clone();
    tokio::spawn(async move {
        let outcome = pending.wait().await;
        output.print(reply_text(&outcome));
    });
}

async fn report_generation(controller: SessionController, pending: PendingGeneration, output: Output) {
    let result = pending.wait().await;
    let puzzle = match &result {
        Ok(_) => controller.snapshot().await.ok().and_then(|s| s.puzzle),
        Err(_) => None,
    };
    output.print(generation_text(&result, puzzle.as_ref()));
}

/// What to show once a reply settles
fn reply_text(outcome: &ChatOutcome) -> String {
    match outcome {
        ChatOutcome::Reply(text) => format!("{} {}\n", "Assistant:".bright_blue(), text),
        ChatOutcome::Fallback(e) => format!(
            "{} {}\n{}\n",
            "Assistant:".bright_blue(),
            FALLBACK_REPLY.red(),
            e.to_string().dimmed()
        ),
        ChatOutcome::Discarded => format!("{}\n", "(earlier reply discarded)".dimmed()),
    }
}

/// What to show once a generation settles
fn generation_text(result: &ControllerResponse<PuzzleSummary>, puzzle: Option<&PuzzleSession>) -> String {
    match result {
        Ok(summary) => {
            let mut text = format!(
                "{} {}x{} grid, {} across, {} down\n",
                "Ready:".bright_green(),
                summary.rows,
                summary.cols,
                summary.across,
                summary.down
            );
            if let Some(puzzle) = puzzle {
                text.push_str(&grid_text(puzzle));
                text.push_str(&render_clues(puzzle.placements(), puzzle.reveal()));
            }
            text
        }
        Err(SessionError::Superseded) => format!("{}\n", "(earlier generation superseded)".dimmed()),
        Err(e) => format!("{} {}\n", "Error:".red(), e),
    }
}

fn grid_text(puzzle: &PuzzleSession) -> String {
    let (filled, total) = puzzle.progress();
    let mut status = format!("{}/{} filled", filled, total);
    if puzzle.reveal() {
        status.push_str(", answers shown");
    }
    format!("\n{}{}\n\n", render_grid(&puzzle.view()), status.dimmed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::controller::{ControllerConfig, SessionEvent};
    use crate::domain::{Clue, Direction, Grid, Placement, WireCell};
    use crate::service::Services;
    use crate::service::mock::{MockAssistantService, MockPuzzleService};

    fn cat_top() -> PuzzleSession {
        let s = |c: &str| Some(c.to_string());
        let rows: Vec<Vec<WireCell>> = vec![
            vec![s("C"), s("A"), s("T")],
            vec![None, None, s("O")],
            vec![None, None, s("P")],
        ];
        PuzzleSession::build(
            Grid::from_wire(&rows).unwrap(),
            vec![
                Placement::new("CAT", 0, 0, Direction::Across, "Feline"),
                Placement::new("TOP", 0, 2, Direction::Down, "Summit"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_reply_text() {
        assert!(reply_text(&ChatOutcome::Reply("Think pets.".to_string())).contains("Think pets."));

        let fallback = reply_text(&ChatOutcome::Fallback(SessionError::ChatFailure("503".to_string())));
        assert!(fallback.contains(FALLBACK_REPLY));
        assert!(fallback.contains("Chat failed: 503"));

        assert!(reply_text(&ChatOutcome::Discarded).contains("discarded"));
    }

    #[test]
    fn test_generation_text_ready() {
        let puzzle = cat_top();
        let summary = PuzzleSummary {
            id: puzzle.id(),
            generation: 1,
            rows: 3,
            cols: 3,
            across: 1,
            down: 1,
        };

        let text = generation_text(&Ok(summary), Some(&puzzle));
        assert!(text.contains("3x3 grid, 1 across, 1 down"));
        assert!(text.contains("  0  .  .  ."));
        assert!(text.contains("0/5 filled"));
        assert!(text.contains("a1   (0,0) Feline"));
    }

    #[test]
    fn test_generation_text_failures() {
        assert!(generation_text(&Err(SessionError::Superseded), None).contains("superseded"));

        let text = generation_text(&Err(SessionError::GenerationFailure("no clues".to_string())), None);
        assert!(text.contains("Generation failed: no clues"));
    }

    fn repl_with(puzzle: Arc<MockPuzzleService>, assistant: Arc<MockAssistantService>) -> ReplSession {
        let controller = SessionController::spawn(Services::new(puzzle, assistant), ControllerConfig::default());
        ReplSession::new(controller, Config::default())
    }

    async fn next_matching(
        events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
        wanted: impl Fn(&SessionEvent) -> bool,
    ) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(event) = events.recv().await
                    && wanted(&event)
                {
                    return event;
                }
            }
        })
        .await
        .expect("event in time")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prompt_returns_while_service_calls_are_pending() {
        let puzzle = Arc::new(MockPuzzleService::new());
        let assistant = Arc::new(MockAssistantService::new());
        let clues_gate = puzzle.push_clues_gated("Animals", Ok(vec![Clue::new("Feline", "CAT")]));
        let reply_gate = assistant.push_reply_gated("CAT", Ok("Think of pets.".to_string()));

        let mut repl = repl_with(puzzle, assistant);
        let mut events = repl.controller.subscribe_events();
        let output = Output { printer: None };

        repl.new_puzzle("Animals", &output).await;
        assert!(repl.controller.snapshot().await.unwrap().generating);

        clues_gate.release();
        next_matching(&mut events, |e| matches!(e, SessionEvent::PuzzleReady(_))).await;

        repl.open_clue("a1", ChatMode::Hint, &output).await.unwrap();
        assert!(repl.controller.snapshot().await.unwrap().clue.is_pending());

        // Typing while the opener is out is rejected, not blocked on
        repl.chat("Is it a dog?", &output).await.unwrap();
        assert_eq!(repl.controller.snapshot().await.unwrap().clue.transcript().len(), 0);

        reply_gate.release();
        next_matching(&mut events, |e| matches!(e, SessionEvent::TranscriptUpdated { len: 1 })).await;
        let clue = repl.controller.snapshot().await.unwrap().clue;
        assert_eq!(clue.transcript()[0].text, "Think of pets.");
    }
}
