//! Filesystem observer
//!
//! Bridges notify's callback thread into tokio: raw events are translated,
//! filtered through [`IgnoreRules`], held back until the write settles, and
//! delivered in order over a bounded channel. Files that exist before the
//! subscription starts never produce events.
//!
//! Every directory the ignore rules keep gets its own non-recursive watch, so
//! ignored trees cost nothing and an unreadable subtree is reported as an
//! [`ObserverEvent::Error`] instead of failing the whole subscription.

use ::ignore::WalkBuilder;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::ignore::{IgnoreConfig, IgnoreRules};
use crate::settle::{Fingerprint, Settler};
use crate::{ChangeEvent, ChangeKind, ObserverEvent};

/// Observer tuning
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// How long a file must stay unchanged before its event is emitted
    pub stability_threshold: Duration,
    /// How often settling files are re-checked
    pub poll_interval: Duration,
    /// Bound of the delivery channel
    pub capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            stability_threshold: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(100),
            capacity: 256,
        }
    }
}

/// A live, non-restartable subscription to changes under one root
pub struct Subscription {
    root: PathBuf,
    ignore_sources: usize,
    events: mpsc::Receiver<ObserverEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Subscribe to changes under `root` and every directory below it
    ///
    /// Only a failure to watch `root` itself is an error; subdirectories that
    /// cannot be read or watched are reported through [`Subscription::next`].
    /// Must be called from within a tokio runtime.
    pub fn start(root: &Path, ignore: IgnoreConfig, config: ObserverConfig) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_path_buf()));
        }
        // notify reports canonical paths on some platforms
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let rules = IgnoreRules::load(&root, ignore)?;
        let ignore_sources = rules.active_sources();

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = raw_tx.send(res);
        })
        .map_err(|source| WatchError::Notify {
            path: root.clone(),
            source,
        })?;

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: root.clone(),
                source,
            })?;
        let mut watched = HashSet::from([root.clone()]);

        let found = scan(&root, &rules);
        let mut startup = found.errors;
        startup.extend(register(found.dirs, &mut watched, |dir| {
            watcher.watch(dir, RecursiveMode::NonRecursive)
        }));
        if !startup.is_empty() {
            warn!(failures = startup.len(), "some directories are not watched");
        }

        let (events_tx, events) = mpsc::channel(config.capacity.max(1));
        let (stop, stop_rx) = oneshot::channel();
        let pump = Pump {
            settler: Settler::new(config.stability_threshold),
            root: root.clone(),
            rules,
            watcher,
            watched,
        };
        let startup = startup.into_iter().map(ObserverEvent::Error).collect();
        let task = tokio::spawn(pump.run(config.poll_interval, startup, raw_rx, events_tx, stop_rx));

        info!(root = %root.display(), "observer subscribed");

        Ok(Self {
            root,
            ignore_sources,
            events,
            stop: Some(stop),
            task: Some(task),
        })
    }

    /// Next settled change or observer error
    pub async fn next(&mut self) -> Option<ObserverEvent> {
        self.events.recv().await
    }

    /// Number of active ignore sources (built-in always counts)
    pub fn ignore_sources(&self) -> usize {
        self.ignore_sources
    }

    /// Unsubscribe and wait for the stabiliser task to exit
    ///
    /// Undelivered events are discarded.
    pub async fn close(mut self) {
        // Fails any send blocked on a full channel
        self.events.close();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "observer task ended abnormally");
            }
        }
        debug!(root = %self.root.display(), "observer closed");
    }
}

/// Stabiliser task state; owns the OS watcher
struct Pump {
    root: PathBuf,
    rules: IgnoreRules,
    settler: Settler,
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
}

impl Pump {
    async fn run(
        mut self,
        poll_interval: Duration,
        startup: Vec<ObserverEvent>,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        events_tx: mpsc::Sender<ObserverEvent>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        if !deliver(&events_tx, startup).await {
            return;
        }

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let outgoing = tokio::select! {
                _ = &mut stop_rx => break,
                raw = raw_rx.recv() => match raw {
                    Some(raw) => self.handle(raw, Instant::now()),
                    None => break,
                },
                _ = ticker.tick(), if self.settler.has_pending() => {
                    let root = &self.root;
                    self.settler
                        .poll(Instant::now(), |path| Fingerprint::of(&root.join(path)))
                        .into_iter()
                        .map(ObserverEvent::Change)
                        .collect()
                }
            };
            if !deliver(&events_tx, outgoing).await {
                break;
            }
        }
        // The watcher is dropped here, which unsubscribes
    }

    fn handle(&mut self, raw: notify::Result<notify::Event>, now: Instant) -> Vec<ObserverEvent> {
        let event = match raw {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "watcher error");
                return vec![ObserverEvent::Error(e.to_string())];
            }
        };

        let mut outgoing = Vec::new();
        self.track_directories(&event, now, &mut outgoing);

        for change in translate(&event) {
            let Ok(rel) = change.path.strip_prefix(&self.root) else {
                debug!(path = %change.path.display(), "event outside watched root");
                continue;
            };
            let change = ChangeEvent::new(rel, change.kind);

            if self.rules.is_ignore_file(&change.path) {
                self.reload_rules(&mut outgoing);
            }
            if self.rules.should_ignore(&change.path) {
                continue;
            }
            if change.kind != ChangeKind::Deleted && self.root.join(&change.path).is_dir() {
                continue;
            }

            if let Some(ready) = self.settler.observe(change, now) {
                outgoing.push(ObserverEvent::Change(ready));
            }
        }
        outgoing
    }

    /// Watch directories that appeared and forget ones that went away
    ///
    /// Files already inside a new directory are reported as added, since
    /// they may have been written before its watch existed.
    fn track_directories(&mut self, event: &notify::Event, now: Instant, outgoing: &mut Vec<ObserverEvent>) {
        let (gone, arrived): (&[PathBuf], &[PathBuf]) = match (&event.kind, event.paths.as_slice()) {
            (EventKind::Remove(_), paths) | (EventKind::Modify(ModifyKind::Name(RenameMode::From)), paths) => {
                (paths, &[])
            }
            (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, to]) => {
                (std::slice::from_ref(from), std::slice::from_ref(to))
            }
            (EventKind::Create(_), paths) | (EventKind::Modify(ModifyKind::Name(RenameMode::To)), paths) => {
                (&[], paths)
            }
            _ => (&[], &[]),
        };

        for path in gone {
            self.forget(path);
        }

        for dir in arrived {
            if !dir.is_dir() || self.rules.should_ignore(dir) {
                continue;
            }
            let found = scan(dir, &self.rules);
            outgoing.extend(found.errors.into_iter().map(ObserverEvent::Error));
            let failures = register(found.dirs, &mut self.watched, |d| {
                self.watcher.watch(d, RecursiveMode::NonRecursive)
            });
            outgoing.extend(failures.into_iter().map(ObserverEvent::Error));

            for file in found.files {
                let Ok(rel) = file.strip_prefix(&self.root) else {
                    continue;
                };
                let change = ChangeEvent::new(rel, ChangeKind::Added);
                if let Some(ready) = self.settler.observe(change, now) {
                    outgoing.push(ObserverEvent::Change(ready));
                }
            }
        }
    }

    fn forget(&mut self, path: &Path) {
        let gone: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path) && dir.as_path() != self.root)
            .cloned()
            .collect();
        for dir in gone {
            // Fails for directories that no longer exist; nothing to undo then
            let _ = self.watcher.unwatch(&dir);
            self.watched.remove(&dir);
        }
    }

    /// Re-read the ignore files and watch directories they no longer exclude
    fn reload_rules(&mut self, outgoing: &mut Vec<ObserverEvent>) {
        if let Err(e) = self.rules.reload_ignore_files() {
            outgoing.push(ObserverEvent::Error(e.to_string()));
            return;
        }
        let found = scan(&self.root, &self.rules);
        outgoing.extend(found.errors.into_iter().map(ObserverEvent::Error));
        let failures = register(found.dirs, &mut self.watched, |d| {
            self.watcher.watch(d, RecursiveMode::NonRecursive)
        });
        outgoing.extend(failures.into_iter().map(ObserverEvent::Error));
    }
}

/// Send in order; false once the receiver is gone
async fn deliver(events_tx: &mpsc::Sender<ObserverEvent>, events: Vec<ObserverEvent>) -> bool {
    for event in events {
        if events_tx.send(event).await.is_err() {
            debug!("observer receiver closed");
            return false;
        }
    }
    true
}

/// What an ignore-aware walk of one directory found
#[derive(Debug, Default)]
struct Scan {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    errors: Vec<String>,
}

/// Walk `dir` without descending into ignored paths
fn scan(dir: &Path, rules: &IgnoreRules) -> Scan {
    let filter = rules.clone();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| !filter.should_ignore(entry.path()))
        .build();

    let mut found = Scan::default();
    for entry in walker {
        match entry {
            Ok(entry) => match entry.file_type() {
                Some(t) if t.is_dir() => found.dirs.push(entry.into_path()),
                Some(t) if t.is_file() => found.files.push(entry.into_path()),
                _ => {}
            },
            Err(e) => {
                warn!(error = %e, "cannot read directory");
                found.errors.push(e.to_string());
            }
        }
    }
    found
}

/// Add a watch for every directory not yet in `watched`; returns the failures
fn register<F>(dirs: Vec<PathBuf>, watched: &mut HashSet<PathBuf>, mut watch: F) -> Vec<String>
where
    F: FnMut(&Path) -> notify::Result<()>,
{
    let mut failures = Vec::new();
    for dir in dirs {
        if watched.contains(&dir) {
            continue;
        }
        match watch(&dir) {
            Ok(()) => {
                watched.insert(dir);
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot watch directory");
                failures.push(format!("cannot watch {}: {}", dir.display(), e));
            }
        }
    }
    failures
}

/// Map one notify event onto zero or more change events (absolute paths)
fn translate(event: &notify::Event) -> Vec<ChangeEvent> {
    let all = |kind: ChangeKind| -> Vec<ChangeEvent> {
        event
            .paths
            .iter()
            .map(|p| ChangeEvent::new(p.clone(), kind))
            .collect()
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => all(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                ChangeEvent::new(from.clone(), ChangeKind::Deleted),
                ChangeEvent::new(to.clone(), ChangeKind::Added),
            ],
            _ => all(ChangeKind::Modified),
        },
        EventKind::Modify(_) => all(ChangeKind::Modified),
        EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        EventKind::Remove(_) => all(ChangeKind::Deleted),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
