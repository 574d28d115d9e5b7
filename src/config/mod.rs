//! Server configuration.
//!
//! Settings come from an optional TOML file overlaid with CLI arguments
//! (CLI wins). `ConfigFile` is the raw deserialized shape; `ServerConfig`
//! is the validated form the rest of the crate consumes.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::logger::Verbosity;
use crate::watch::ignore::IgnoreMatcher;
use crate::{log, warn};

/// Default listen port, matching the conventional dev server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default debounce window for the change watcher.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid host address: {0}")]
    InvalidHost(String),

    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("invalid ignore pattern {0}: {1}")]
    InvalidIgnore(String, #[source] regex::Error),
}

/// Raw configuration as written in a TOML file or assembled from CLI
/// arguments. All fields optional so sources can be overlaid.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
    pub watch: Vec<PathBuf>,
    pub ignore: Vec<String>,
    pub poll: Option<bool>,
    pub debounce_ms: Option<u64>,
    pub verbosity: Option<Verbosity>,
}

impl ConfigFile {
    /// Load from a TOML file, warning about unknown fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            warn!("config"; "unknown fields in {}, ignoring:", path.display());
            for field in &ignored {
                warn!("config"; "- {field}");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Overlay `over` on top of `self`. Fields set in `over` win;
    /// list fields win when non-empty.
    pub fn overlay(mut self, over: Self) -> Self {
        self.host = over.host.or(self.host);
        self.port = over.port.or(self.port);
        self.root = over.root.or(self.root);
        if !over.watch.is_empty() {
            self.watch = over.watch;
        }
        if !over.ignore.is_empty() {
            self.ignore = over.ignore;
        }
        self.poll = over.poll.or(self.poll);
        self.debounce_ms = over.debounce_ms.or(self.debounce_ms);
        self.verbosity = over.verbosity.or(self.verbosity);
        self
    }

    /// Validate and fill defaults, producing the config the server runs on.
    pub fn resolve(self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = match self.host {
            Some(h) => h.parse().map_err(|_| ConfigError::InvalidHost(h))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        let root = root
            .canonicalize()
            .map_err(|_| ConfigError::RootNotFound(root.clone()))?;
        if !root.is_dir() {
            return Err(ConfigError::RootNotADirectory(root));
        }

        let watch = if self.watch.is_empty() {
            vec![root.clone()]
        } else {
            self.watch
                .into_iter()
                .map(|p| if p.is_absolute() { p } else { root.join(p) })
                .collect()
        };

        let mut ignore = vec![IgnoreMatcher::builtin()];
        for s in &self.ignore {
            let matcher = IgnoreMatcher::parse(s, &root)
                .map_err(|e| ConfigError::InvalidIgnore(s.clone(), e))?;
            ignore.push(matcher);
        }

        Ok(ServerConfig {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            root,
            watch,
            ignore,
            poll: self.poll.unwrap_or(false),
            debounce: Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
            verbosity: self.verbosity.unwrap_or(Verbosity::Info),
        })
    }
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. The wildcard is displayed as 127.0.0.1.
    pub host: IpAddr,
    /// Port to bind; 0 picks an ephemeral port.
    pub port: u16,
    /// Canonicalized directory being served.
    pub root: PathBuf,
    /// Directories the watcher covers. Defaults to the root.
    pub watch: Vec<PathBuf>,
    /// Ignore rules, builtin rule first.
    pub ignore: Vec<IgnoreMatcher>,
    /// Force the polling watcher backend.
    pub poll: bool,
    /// Coalescing window for change events. Zero disables debouncing.
    pub debounce: Duration,
    pub verbosity: Verbosity,
}

impl ServerConfig {
    /// Config for serving `root` with everything else at defaults.
    pub fn for_root(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        ConfigFile {
            root: Some(root.into()),
            ..ConfigFile::default()
        }
        .resolve()
    }

    /// True when any ignore rule suppresses this path.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.iter().any(|m| m.matches(path))
    }

    /// The URL printed at startup. A wildcard bind is shown as loopback.
    pub fn display_url(&self, port: u16) -> String {
        let shown: IpAddr = if self.host.is_unspecified() {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
        };
        format!("http://{shown}:{port}/")
    }

    /// Log candidate LAN URLs when bound to a wildcard address.
    pub fn log_interface_urls(&self, port: u16) {
        if !self.host.is_unspecified() {
            return;
        }
        for ip in crate::utils::net::local_ipv4_addrs() {
            log!("serve"; "also reachable at http://{ip}:{port}/");
        }
    }
}
