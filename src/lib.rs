//! reflex - a development file server with live browser reload.
//!
//! Serves a directory over HTTP, injects a small reload client into HTML
//! pages, watches the filesystem, and tells connected browsers to reload
//! when files change.

pub mod cli;
pub mod config;
pub mod embed;
pub mod logger;
pub mod reload;
pub mod server;
pub mod utils;
pub mod watch;

pub use config::{ConfigFile, ServerConfig};
pub use server::{BoundServer, ServerHandle, bind_server, start};
