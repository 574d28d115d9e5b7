//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::IpAddr;
use std::path::PathBuf;

/// Development file server with live browser reload
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to serve (default: current directory)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short = 'H', long)]
    pub host: Option<IpAddr>,

    /// Port number to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Paths to watch instead of the root (comma-separated, relative to root)
    #[arg(short, long, value_delimiter = ',')]
    pub watch: Vec<PathBuf>,

    /// Paths or globs never reported as changes (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Force the polling watcher backend (for network mounts)
    #[arg(long)]
    pub poll: bool,

    /// Change coalescing window in milliseconds (0 disables)
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Config file path
    #[arg(short = 'C', long, default_value = "reflex.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Suppress all output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output (per-request logs, LAN URLs)
    #[arg(short, long)]
    pub verbose: bool,
}
