pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod labels;
pub mod logging;
pub mod painter;
pub mod state;
pub mod storage;
pub use error::{AppError, AppResult};

use clap::Parser;

/// Entrypoint used by the binary and other CLI bindings.
pub fn run() -> AppResult<()> {
    logging::init();
    let cli = cli::Cli::parse();
    tracing::debug!(command = ?cli.command, "starting labelpaint");
    cli::execute(cli)
}
