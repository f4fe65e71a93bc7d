//! Change Watcher
//!
//! Monitors every local source for filesystem changes, turns raw `notify`
//! events into [`ChangeEvent`]s and hands them to registered callbacks.
//! Versioned sources are immutable snapshots and are never watched.
//!
//! One dedicated thread owns the host watcher for its whole life. Stopping
//! the watcher sends a stop message, joins that thread and drops the
//! underlying notification handle.

use crate::config::ForestConfig;
use crate::error::ApiError;
use crate::exclude::GlobalRules;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Kind of a domain change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Remove,
    Rename,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Remove => "remove",
            ChangeKind::Rename => "rename",
        }
    }
}

/// A classified, filtered change to one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Absolute path of the changed entry
    pub path: PathBuf,
}

/// Subscriber callback, invoked synchronously on the watch thread.
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

enum LoopMessage {
    Notify(notify::Result<Event>),
    Stop,
}

struct LoopHandle {
    tx: mpsc::Sender<LoopMessage>,
    thread: JoinHandle<()>,
}

/// Watches local sources and fans changes out to callbacks.
pub struct ChangeWatcher {
    roots: Vec<PathBuf>,
    rules: GlobalRules,
    callbacks: Arc<RwLock<Vec<ChangeCallback>>>,
    watched: Arc<RwLock<HashSet<PathBuf>>>,
    handle: Mutex<Option<LoopHandle>>,
}

impl ChangeWatcher {
    /// Watcher over every local (ref-less) source in `config`.
    pub fn new(config: &ForestConfig) -> Self {
        let roots = config
            .sources
            .iter()
            .filter(|s| !s.is_versioned())
            .map(|s| s.path.clone())
            .collect();
        Self::with_roots(roots, GlobalRules::new(&config.exclude, &config.extensions))
    }

    pub fn with_roots(roots: Vec<PathBuf>, rules: GlobalRules) -> Self {
        Self {
            roots,
            rules,
            callbacks: Arc::new(RwLock::new(Vec::new())),
            watched: Arc::new(RwLock::new(HashSet::new())),
            handle: Mutex::new(None),
        }
    }

    /// Register a callback for every future change.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Directories currently registered for notification.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watched.read().iter().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Register every non-excluded directory and start the event loop.
    pub fn start(&self) -> Result<(), ApiError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(ApiError::WatchError("Watcher already running".to_string()));
        }

        let (tx, rx) = mpsc::channel();
        let notify_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            if notify_tx.send(LoopMessage::Notify(res)).is_err() {
                debug!("Watch loop gone; dropping notification");
            }
        })?;

        {
            let mut watched = self.watched.write();
            watched.clear();
            for root in &self.roots {
                for dir in enumerate_dirs(root, &self.rules) {
                    match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                        Ok(()) => {
                            watched.insert(dir);
                        }
                        Err(e) => warn!(path = %dir.display(), error = %e, "Cannot watch directory"),
                    }
                }
            }
            info!(directories = watched.len(), roots = self.roots.len(), "Watching sources");
        }

        let rules = self.rules.clone();
        let callbacks = Arc::clone(&self.callbacks);
        let watched = Arc::clone(&self.watched);
        let thread = std::thread::Builder::new()
            .name("docforest-watch".to_string())
            .spawn(move || run_loop(watcher, rx, rules, callbacks, watched))?;

        *handle = Some(LoopHandle { tx, thread });
        Ok(())
    }

    /// Stop the event loop and release the host watcher. Idempotent.
    pub fn stop(&self) -> Result<(), ApiError> {
        let Some(handle) = self.handle.lock().take() else {
            return Ok(());
        };
        if handle.tx.send(LoopMessage::Stop).is_err() {
            debug!("Watch loop already exited");
        }
        handle
            .thread
            .join()
            .map_err(|_| ApiError::WatchError("Watch loop panicked".to_string()))?;
        self.watched.write().clear();
        info!("Watcher stopped");
        Ok(())
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "Failed to stop watcher");
        }
    }
}

fn run_loop(
    mut watcher: RecommendedWatcher,
    rx: mpsc::Receiver<LoopMessage>,
    rules: GlobalRules,
    callbacks: Arc<RwLock<Vec<ChangeCallback>>>,
    watched: Arc<RwLock<HashSet<PathBuf>>>,
) {
    for message in rx {
        let event = match message {
            LoopMessage::Stop => break,
            LoopMessage::Notify(Ok(event)) => event,
            LoopMessage::Notify(Err(e)) => {
                warn!(error = %e, "Watch error");
                continue;
            }
        };

        for change in convert_event(&event, &rules) {
            if change.kind == ChangeKind::Create && change.path.is_dir() {
                match watcher.watch(&change.path, RecursiveMode::NonRecursive) {
                    Ok(()) => {
                        watched.write().insert(change.path.clone());
                    }
                    Err(e) => {
                        warn!(path = %change.path.display(), error = %e, "Cannot watch new directory")
                    }
                }
            }

            debug!(kind = change.kind.as_str(), path = %change.path.display(), "Change detected");
            let snapshot: Vec<ChangeCallback> = callbacks.read().clone();
            for callback in snapshot {
                callback(&change);
            }
        }
    }
    drop(watcher);
    debug!("Watch loop exited");
}

/// Every directory under `root` whose name is not globally excluded.
fn enumerate_dirs(root: &Path, rules: &GlobalRules) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !(entry.file_type().is_dir()
                && rules.is_excluded(&entry.file_name().to_string_lossy()))
    });
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(root = %root.display(), error = %e, "Failed to walk source"),
        }
    }
    dirs
}

/// Map a raw operation onto a domain change kind.
///
/// Paired renames arrive as separate `From`/`To` notifications; the combined
/// `Both` notification is dropped so each rename is reported once.
fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Rename),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Update),
        EventKind::Remove(_) => Some(ChangeKind::Remove),
        _ => None,
    }
}

/// Classify and filter one raw event.
fn convert_event(event: &Event, rules: &GlobalRules) -> Vec<ChangeEvent> {
    let Some(kind) = classify(&event.kind) else {
        return Vec::new();
    };

    event
        .paths
        .iter()
        .filter(|path| {
            let path_str = path.to_string_lossy();
            if rules.is_excluded(&path_str) {
                return false;
            }
            path.is_dir() || rules.has_recognized_extension(&path_str)
        })
        .map(|path| ChangeEvent {
            kind,
            path: path.clone(),
        })
        .collect()
}
