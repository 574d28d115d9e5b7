//! Filesystem watching.
//!
//! The watch actor owns a notify watcher and forwards debounced, filtered
//! change events over a channel. Delivery to browsers happens in the
//! broadcast task spawned next to it; the actor never touches the HTTP
//! server.
//!
//! ```text
//! notify → bridge thread → Debouncer → ChangeEvent channel → broadcast
//! ```

pub mod debounce;
pub mod ignore;


use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::Receiver;
use notify::{PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::reload::ClientRegistry;
use crate::{debug, error, log};
use debounce::Debouncer;
use ignore::IgnoreMatcher;

/// Poll interval used when the polling backend is forced.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the event-loop sleep. Root maintenance runs on wakeup,
/// so an idle debouncer must not sleep indefinitely: a deleted root that
/// reappears produces no event to wake the loop.
const MAINTAIN_INTERVAL: Duration = Duration::from_secs(1);

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    DirAdded,
    DirRemoved,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::DirAdded => "dir added",
            Self::DirRemoved => "dir removed",
        }
    }

    fn is_removal(self) -> bool {
        matches!(self, Self::Removed | Self::DirRemoved)
    }

    fn is_appearance(self) -> bool {
        matches!(self, Self::Added | Self::DirAdded)
    }
}

/// One debounced change, ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Map a notify event onto a change kind.
///
/// Metadata-only modifications are noise (mtime/chmod churn) and map to
/// `None`, as do access events.
fn classify(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;
    use notify::event::{CreateKind, RemoveKind};

    match kind {
        EventKind::Create(CreateKind::Folder) => Some(ChangeKind::DirAdded),
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Remove(RemoveKind::Folder) => Some(ChangeKind::DirRemoved),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(modify) => {
            if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                return None;
            }
            Some(ChangeKind::Modified)
        }
        _ => None,
    }
}

/// Watch-root consistency manager.
///
/// Attaches existing roots at startup and re-attaches roots that were
/// removed and recreated.
struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    /// Attach every root that exists. A root that fails to attach is
    /// logged and skipped; the watcher keeps running without it.
    fn attach_existing(&mut self, watcher: &mut dyn Watcher) {
        for path in &self.desired {
            if !path.exists() {
                continue;
            }
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => {
                    self.attached.insert(path.clone());
                }
                Err(e) => error!("watch"; "cannot watch {}: {}", path.display(), e),
            }
        }
    }

    fn maintain(&mut self, watcher: &mut dyn Watcher) {
        // Drop stale handles for roots that no longer exist.
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }

            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
    }
}

/// Watches the configured roots and emits debounced change events.
pub struct WatchActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: Box<dyn Watcher + Send>,
    roots: WatchRoots,
    debouncer: Debouncer,
    ignore: Vec<IgnoreMatcher>,
    /// Channel carrying debounced events to the broadcast task
    events_tx: mpsc::Sender<ChangeEvent>,
}

impl WatchActor {
    /// Create the actor and start watching immediately.
    ///
    /// Events buffer in the notify channel until `run` drains them, so
    /// nothing is lost between construction and the event loop.
    pub fn new(
        roots: Vec<PathBuf>,
        poll: bool,
        window: Duration,
        ignore: Vec<IgnoreMatcher>,
        events_tx: mpsc::Sender<ChangeEvent>,
    ) -> notify::Result<Self> {
        // notify's callback API is sync; bridge through a std channel
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let handler = move |res| {
            let _ = notify_tx.send(res);
        };

        let mut watcher: Box<dyn Watcher + Send> = if poll {
            let config = notify::Config::default().with_poll_interval(POLL_INTERVAL);
            Box::new(PollWatcher::new(handler, config)?)
        } else {
            Box::new(RecommendedWatcher::new(handler, notify::Config::default())?)
        };

        let mut roots = WatchRoots::new(roots);
        roots.attach_existing(watcher.as_mut());

        Ok(Self {
            notify_rx,
            watcher,
            roots,
            debouncer: Debouncer::new(window),
            ignore,
            events_tx,
        })
    }

    /// Run the actor event loop.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut roots,
            mut debouncer,
            ignore,
            events_tx,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Poll notify events on a plain thread and forward them
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => error!("watch"; "notify error: {}", e),
                }
            }
        });

        log!("watch"; "ready for changes");

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => note(&mut debouncer, &ignore, &event),
                _ = tokio::time::sleep(debouncer.sleep_duration().min(MAINTAIN_INTERVAL)) => {
                    // Ensure watcher roots remain attached.
                    roots.maintain(watcher.as_mut());
                    if flush(&mut debouncer, &events_tx).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Record a raw notify event, filtering ignored paths.
fn note(debouncer: &mut Debouncer, ignore: &[IgnoreMatcher], event: &notify::Event) {
    let Some(kind) = classify(&event.kind) else {
        return;
    };

    for path in &event.paths {
        if ignore.iter().any(|m| m.matches(path)) {
            continue;
        }
        debouncer.add(path.clone(), kind);
    }
}

/// Forward debounced events. Returns `Err(())` when the receiver is gone.
async fn flush(debouncer: &mut Debouncer, events_tx: &mpsc::Sender<ChangeEvent>) -> Result<(), ()> {
    let Some(events) = debouncer.take_if_ready() else {
        return Ok(());
    };

    for event in events {
        events_tx.send(event).await.map_err(|_| ())?;
    }
    Ok(())
}

/// Spawn the watch/broadcast pipeline on its own runtime thread.
///
/// The pipeline keeps running until `shutdown_rx` fires; dropping the
/// runtime then cancels both tasks. Watcher startup failure is logged,
/// never fatal to the HTTP server.
pub fn spawn_watch_system(
    config: ServerConfig,
    clients: Arc<ClientRegistry>,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let Ok(rt) = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        else {
            error!("watch"; "failed to create runtime");
            return;
        };

        rt.block_on(async move {
            let (events_tx, mut events_rx) = mpsc::channel::<ChangeEvent>(64);

            let actor = match WatchActor::new(
                config.watch.clone(),
                config.poll,
                config.debounce,
                config.ignore.clone(),
                events_tx,
            ) {
                Ok(actor) => actor,
                Err(e) => {
                    error!("watch"; "watcher failed: {}", e);
                    return;
                }
            };

            tokio::spawn(actor.run());

            tokio::spawn(async move {
                while let Some(event) = events_rx.recv().await {
                    log!("watch"; "change detected: {}", event.path.display());
                    // Drain the burst; one broadcast covers all of it
                    while let Ok(more) = events_rx.try_recv() {
                        log!("watch"; "change detected: {}", more.path.display());
                    }
                    clients.broadcast();
                }
            });

            loop {
                if shutdown_rx.try_recv().is_ok() {
                    debug!("watch"; "shutdown signal received");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
    })
}
