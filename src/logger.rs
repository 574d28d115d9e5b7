//! Logging utilities with colored output.
//!
//! This module provides the `log!`/`warn!`/`error!`/`debug!` macro family
//! for formatted terminal output with colored module prefixes, gated by a
//! global verbosity level.
//!
//! # Example
//!
//! ```ignore
//! log!("serve"; "serving {} at {}", root.display(), url);
//! debug!("watch"; "coalesced {} events", count);
//! ```

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use std::{
    io::{Write, stderr, stdout},
    sync::atomic::{AtomicU8, Ordering},
};

/// Output verbosity, ordered from silent to chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No output at all.
    Quiet = 0,
    /// Errors and warnings only.
    Errors = 1,
    /// Startup banner, change notifications (default).
    Info = 2,
    /// Everything, including per-request logs.
    Verbose = 3,
}

impl Verbosity {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Quiet,
            1 => Self::Errors,
            3 => Self::Verbose,
            _ => Self::Info,
        }
    }
}

/// Global verbosity level (set from CLI/config at startup)
static LEVEL: AtomicU8 = AtomicU8::new(Verbosity::Info as u8);

/// Set the global verbosity level
pub fn set_level(level: Verbosity) {
    LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Current global verbosity level
pub fn level() -> Verbosity {
    Verbosity::from_u8(LEVEL.load(Ordering::SeqCst))
}

/// Check whether messages at `at` should be emitted
pub fn enabled(at: Verbosity) -> bool {
    level() >= at
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix (Info level)
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Verbosity::Info) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a warning (Errors level and above, goes to stderr)
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Verbosity::Errors) {
            $crate::logger::log_err($module, false, &format!($($arg)*))
        }
    }};
}

/// Log an error (Errors level and above, goes to stderr)
#[macro_export]
macro_rules! error {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Verbosity::Errors) {
            $crate::logger::log_err($module, true, &format!($($arg)*))
        }
    }};
}

/// Log a debug message (only shown at Verbose)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::Verbosity::Verbose) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Log a warning or error to stderr
#[inline]
pub fn log_err(module: &str, is_error: bool, message: &str) {
    let prefix = if is_error {
        format!("[{module}]").bright_red().bold().to_string()
    } else {
        format!("[{module}]").bright_yellow().bold().to_string()
    };

    let mut stderr = stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "reload" => prefix.bright_cyan().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Quiet < Verbosity::Errors);
        assert!(Verbosity::Errors < Verbosity::Info);
        assert!(Verbosity::Info < Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_roundtrip() {
        for level in [
            Verbosity::Quiet,
            Verbosity::Errors,
            Verbosity::Info,
            Verbosity::Verbose,
        ] {
            assert_eq!(Verbosity::from_u8(level as u8), level);
        }
    }
}
