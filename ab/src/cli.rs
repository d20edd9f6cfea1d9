//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::Difficulty;

/// AcrossBoard - topic-driven crossword puzzles
#[derive(Parser)]
#[command(
    name = "ab",
    about = "Generate crossword puzzles from topics and get hints per clue",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Service base URL, overriding the config file
    #[arg(long = "base-url", global = true, help = "Service base URL (overrides config)")]
    pub base_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive puzzle session (default)
    Play,

    /// Check whether the service is reachable
    Health,

    /// List models offered by the service
    Models,

    /// List difficulty levels offered by the service
    Difficulties,

    /// Generate one puzzle and print it
    Generate {
        /// Comma-separated topics
        #[arg(short, long)]
        topics: String,

        /// Difficulty (Easy, Medium, Hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Number of clues to request
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Model used for clue generation
        #[arg(short, long)]
        model: Option<String>,

        /// Print answers in the grid and clue list
        #[arg(long)]
        reveal: bool,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("acrossboard")
        .join("logs")
        .join("acrossboard.log");
    debug!(?path, "get_log_path: returning path");
    path
}
