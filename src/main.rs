//! reflex - a development file server with live browser reload.

use anyhow::Result;
use clap::{ColorChoice, Parser};

use reflex::cli::{self, Cli};
use reflex::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = cli::load_config(&cli)?;
    logger::set_level(config.verbosity);

    let bound = reflex::bind_server(config)?;

    // Ctrl+C triggers the same idempotent shutdown path as everything else
    let handle = bound.handle();
    ctrlc::set_handler(move || {
        handle.shutdown();
    })?;

    bound.run()
}
