//! CLI entry points.

pub mod args;

pub use args::Cli;

use anyhow::Result;

use crate::config::{ConfigFile, ServerConfig};
use crate::logger::Verbosity;

/// Assemble the runtime config: TOML file first, CLI flags on top.
pub fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let file = if cli.config.is_file() {
        ConfigFile::load(&cli.config)?
    } else {
        ConfigFile::default()
    };

    let config = file.overlay(cli_overlay(cli)).resolve()?;
    Ok(config)
}

/// Map CLI flags onto the overlay shape shared with the config file.
fn cli_overlay(cli: &Cli) -> ConfigFile {
    let verbosity = if cli.quiet {
        Some(Verbosity::Quiet)
    } else if cli.verbose {
        Some(Verbosity::Verbose)
    } else {
        None
    };

    ConfigFile {
        host: cli.host.map(|h| h.to_string()),
        port: cli.port,
        root: cli.root.clone(),
        watch: cli.watch.clone(),
        ignore: cli.ignore.clone(),
        poll: cli.poll.then_some(true),
        debounce_ms: cli.debounce_ms,
        verbosity,
    }
}
