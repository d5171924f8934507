//! # glyphreel
//!
//! Plays video files in the terminal as text, in sync with their audio.

mod backend;
mod cli;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use backend::TerminalBackend;
use clap::Parser;
use cli::Cli;
use glyphreel_core::{Error, PlayerConfig};
use glyphreel_engine::Controller;
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<Error>().is_some_and(Error::is_interrupt) => {
            info!("Stopped by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    logging::init(cli.log.as_deref())?;
    info!("Starting glyphreel v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::load_default()?,
    };
    cli.apply(&mut config);
    config.validate()?;

    // Ctrl-C and SIGTERM both land here.
    let (interrupt_tx, interrupts) = crossbeam_channel::unbounded();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("Failed to install interrupt handler")?;

    let backend = TerminalBackend::new(&config);
    let mut controller = Controller::new(backend, config, interrupts);
    for file in &cli.files {
        controller.play(file)?;
    }
    Ok(())
}
