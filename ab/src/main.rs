//! AcrossBoard - topic-driven crossword client
//!
//! CLI entry point for the interactive session and one-shot commands.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use acrossboard::cli::{Cli, Command};
use acrossboard::config::Config;
use acrossboard::controller::{ControllerConfig, GenerateRequest, SessionController};
use acrossboard::domain::Difficulty;
use acrossboard::repl::{self, render_clues, render_grid};
use acrossboard::service::{create_services, difficulties_or_default, models_or_default};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("acrossboard")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("acrossboard.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .with_base_url(cli.base_url.as_deref());

    info!("AcrossBoard loaded config: service={}", config.service.base_url);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Play) | None => {
            debug!("main: matched Play command");
            repl::run_interactive(config).await
        }
        Some(Command::Health) => {
            debug!("main: matched Health command");
            cmd_health(&config).await
        }
        Some(Command::Models) => {
            debug!("main: matched Models command");
            cmd_models(&config).await
        }
        Some(Command::Difficulties) => {
            debug!("main: matched Difficulties command");
            cmd_difficulties(&config).await
        }
        Some(Command::Generate {
            topics,
            difficulty,
            count,
            model,
            reveal,
        }) => {
            debug!(%topics, ?difficulty, ?count, ?model, reveal, "main: matched Generate command");
            cmd_generate(&config, topics, difficulty, count, model, reveal).await
        }
    }
}

/// Probe the service health endpoint
async fn cmd_health(config: &Config) -> Result<()> {
    debug!("cmd_health: called");
    let services = create_services(&config.service).context("Failed to create service client")?;

    if services.puzzle.health_check().await {
        println!("{} Service reachable at {}", "✓".green(), config.service.base_url);
        Ok(())
    } else {
        println!("{} Service unreachable at {}", "✗".red(), config.service.base_url);
        Err(eyre::eyre!("health check failed"))
    }
}

/// List models, falling back to the configured ones
async fn cmd_models(config: &Config) -> Result<()> {
    debug!("cmd_models: called");
    let services = create_services(&config.service).context("Failed to create service client")?;

    for model in models_or_default(services.puzzle.as_ref(), &config.known_models()).await {
        println!("{}", model);
    }
    Ok(())
}

/// List difficulty levels, falling back to Easy/Medium/Hard
async fn cmd_difficulties(config: &Config) -> Result<()> {
    debug!("cmd_difficulties: called");
    let services = create_services(&config.service).context("Failed to create service client")?;

    for level in difficulties_or_default(services.puzzle.as_ref()).await {
        println!("{}", level);
    }
    Ok(())
}

/// Generate a single puzzle and print it
async fn cmd_generate(
    config: &Config,
    topics: String,
    difficulty: Option<Difficulty>,
    count: Option<usize>,
    model: Option<String>,
    reveal: bool,
) -> Result<()> {
    debug!("cmd_generate: called");
    let services = create_services(&config.service).context("Failed to create service client")?;
    let controller = SessionController::connect(services, ControllerConfig::from(config))
        .await
        .map_err(|e| eyre::eyre!(e))?;

    let request = GenerateRequest {
        topics,
        difficulty: difficulty.unwrap_or(config.generation.difficulty),
        clue_model: model.unwrap_or_else(|| config.generation.clue_model.clone()),
        clue_count: count.unwrap_or(config.generation.clue_count),
    };

    let summary = controller
        .generate(request)
        .await
        .map_err(|e| eyre::eyre!(e))?
        .wait()
        .await
        .map_err(|e| eyre::eyre!(e))?;
    info!(?summary, "cmd_generate: puzzle ready");

    if reveal {
        controller.set_reveal(true).await.map_err(|e| eyre::eyre!(e))?;
    }

    let snapshot = controller.snapshot().await.map_err(|e| eyre::eyre!(e))?;
    if let Some(puzzle) = snapshot.puzzle {
        print!("{}", render_grid(&puzzle.view()));
        println!();
        print!("{}", render_clues(puzzle.placements(), puzzle.reveal()));
    }

    controller.shutdown().await.map_err(|e| eyre::eyre!(e))?;
    Ok(())
}
