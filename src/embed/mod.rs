//! Embedded static resources.
//!
//! The reload client fragment is spliced into served HTML pages by the
//! content injector. It opens a WebSocket back to the listening port and
//! reloads the page when the server broadcasts a change.

/// HTML fragment with the live reload client script.
pub const RELOAD_SCRIPT: &str = include_str!("reload.html");
