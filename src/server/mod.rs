//! HTTP server with live reload support.

pub mod bind;
pub mod inject;
pub mod listing;
pub mod resolve;
pub mod respond;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use anyhow::Result;
use crossbeam::channel;
use tiny_http::{Method, Request, Server};

use crate::config::ServerConfig;
use crate::logger::Verbosity;
use crate::reload::ClientRegistry;
use crate::watch::spawn_watch_system;
use crate::{debug, error, log, warn};
use resolve::Disposition;

/// Owned handle to a running server.
///
/// Cheap to clone; every clone controls the same instance. Multiple
/// servers can run side by side in one process, each with its own handle.
#[derive(Clone)]
pub struct ServerHandle {
    server: Arc<Server>,
    shutdown_tx: channel::Sender<()>,
    clients: Arc<ClientRegistry>,
    closed: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Stop the watcher, close reload channels, and unblock the listener.
    ///
    /// Safe to call repeatedly and from signal handlers; only the first
    /// call does any work.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
        self.clients.close_all();
        self.server.unblock();
    }
}

/// Bound server ready to accept requests.
///
/// Binding is separate from running so callers learn the effective
/// address (and can hand out the handle) before the loop blocks.
pub struct BoundServer {
    config: ServerConfig,
    server: Arc<Server>,
    addr: SocketAddr,
    clients: Arc<ClientRegistry>,
    shutdown_tx: channel::Sender<()>,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
pub fn bind_server(config: ServerConfig) -> Result<BoundServer> {
    let requested = SocketAddr::new(config.host, config.port);
    let (server, addr) = bind::bind_with_retry(requested, bind::RETRY_BACKOFF)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();

    log!("serve"; "serving {} at {}", config.root.display(), config.display_url(addr.port()));
    if config.verbosity == Verbosity::Verbose {
        config.log_interface_urls(addr.port());
    }

    Ok(BoundServer {
        config,
        server,
        addr,
        clients: Arc::new(ClientRegistry::new()),
        shutdown_tx,
        shutdown_rx,
    })
}

impl BoundServer {
    /// The address the listener actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle controlling this instance.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server: Arc::clone(&self.server),
            shutdown_tx: self.shutdown_tx.clone(),
            clients: Arc::clone(&self.clients),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the watcher and run the request loop (blocking).
    ///
    /// The watcher starts concurrently and never gates request serving.
    pub fn run(self) -> Result<()> {
        let watch_handle = spawn_watch_system(
            self.config.clone(),
            Arc::clone(&self.clients),
            self.shutdown_rx.clone(),
        );
        run_request_loop(&self.server, &self.config, &self.clients);
        wait_for_shutdown(watch_handle);
        Ok(())
    }
}

/// Bind and serve on a background thread.
///
/// Returns the handle and the effective address; the caller decides when
/// to shut down.
pub fn start(config: ServerConfig) -> Result<(ServerHandle, SocketAddr)> {
    let bound = bind_server(config)?;
    let handle = bound.handle();
    let addr = bound.addr();

    std::thread::spawn(move || {
        if let Err(e) = bound.run() {
            error!("serve"; "server error: {e}");
        }
    });

    Ok((handle, addr))
}

fn run_request_loop(server: &Server, config: &ServerConfig, clients: &Arc<ClientRegistry>) {
    // Thread pool keeps one slow transfer from blocking other requests
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    for request in server.incoming_requests() {
        let config = config.clone();
        let clients = Arc::clone(clients);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &config, &clients) {
                warn!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request.
fn handle_request(
    request: Request,
    config: &ServerConfig,
    clients: &Arc<ClientRegistry>,
) -> Result<()> {
    // Reload channel shares the listening port
    if ClientRegistry::wants_upgrade(&request) {
        return clients.accept(request);
    }

    let url = request.url().to_string();
    let method = request.method().clone();

    let Some(path) = resolve::request_path(&url) else {
        log_request(&method, &url, 404);
        let stripped = url.split('?').next().unwrap_or(&url);
        return respond::respond_not_found(request, stripped);
    };

    match resolve::resolve(&config.root, &method, &path) {
        Disposition::ServeFile(file) | Disposition::ServeIndexHtml(file) => {
            // The file may have become a directory since the stat
            if file.is_dir() {
                log_request(&method, &url, 301);
                return respond::respond_redirect(request, &format!("{path}/"));
            }
            log_request(&method, &url, 200);
            respond::respond_file(request, &file, &path)
        }
        Disposition::RedirectToDirectory(location) => {
            log_request(&method, &url, 301);
            respond::respond_redirect(request, &location)
        }
        Disposition::ServeDirectoryListing(dir) => {
            log_request(&method, &url, 200);
            listing::respond_listing(request, &dir, &path)
        }
        Disposition::NotFound => {
            log_request(&method, &url, 404);
            respond::respond_not_found(request, &path)
        }
    }
}

/// Request log shadow: failures at Errors verbosity, everything at Verbose.
fn log_request(method: &Method, url: &str, status: u16) {
    if status >= 400 {
        warn!("serve"; "{} {url} -> {status}", method.as_str());
    } else {
        debug!("serve"; "{} {url} -> {status}", method.as_str());
    }
}

/// Wait for the watch system to wind down (max 2 seconds).
fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}
