//! Interactive REPL for AcrossBoard
//!
//! Line-based front-end over the SessionController: slash commands drive
//! puzzle generation and clue selection, plain lines go to the open clue
//! conversation.

mod render;
mod session;

pub use render::{clue_ref, parse_clue_ref, render_clues, render_grid};
pub use session::ReplSession;

use colored::Colorize;
use eyre::Result;

use crate::config::Config;
use crate::controller::{ControllerConfig, SessionController};
use crate::service::create_services;

/// Run the interactive REPL
///
/// This is the main entry point for `ab play`. A failed health check stops
/// here with a notice; no session is created.
pub async fn run_interactive(config: Config) -> Result<()> {
    let services =
        create_services(&config.service).map_err(|e| eyre::eyre!("Failed to create service client: {}", e))?;

    let controller = match SessionController::connect(services, ControllerConfig::from(&config)).await {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            eprintln!("Is the service running at {}?", config.service.base_url);
            return Err(eyre::eyre!(e));
        }
    };

    let mut session = ReplSession::new(controller, config);
    session.run().await
}
