//! Write stabilisation
//!
//! Holds back added/modified events until the file's size and mtime have
//! stopped changing for `threshold`, so a half-written file never triggers
//! a push.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

use crate::{ChangeEvent, ChangeKind};

/// Size and modification time of a file at one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    pub(crate) fn of(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    #[cfg(test)]
    pub(crate) fn new(len: u64) -> Self {
        Self { len, modified: None }
    }
}

#[derive(Debug)]
struct PendingWrite {
    kind: ChangeKind,
    fingerprint: Option<Fingerprint>,
    stable_since: Instant,
}

#[derive(Debug)]
pub(crate) struct Settler {
    threshold: Duration,
    pending: HashMap<PathBuf, PendingWrite>,
}

impl Settler {
    pub(crate) fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: HashMap::new(),
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Accept a raw event; returns it immediately when no settling applies
    pub(crate) fn observe(&mut self, event: ChangeEvent, now: Instant) -> Option<ChangeEvent> {
        if event.kind == ChangeKind::Deleted {
            return match self.pending.remove(&event.path) {
                // Created and removed before it ever settled
                Some(write) if write.kind == ChangeKind::Added => None,
                _ => Some(event),
            };
        }

        if self.threshold.is_zero() {
            return Some(event);
        }

        let entry = self.pending.entry(event.path).or_insert(PendingWrite {
            kind: event.kind,
            fingerprint: None,
            stable_since: now,
        });
        if entry.kind != ChangeKind::Added {
            entry.kind = event.kind;
        }
        entry.stable_since = now;
        None
    }

    /// Re-stat every pending path and release the ones that settled
    pub(crate) fn poll<F>(&mut self, now: Instant, mut stat: F) -> Vec<ChangeEvent>
    where
        F: FnMut(&Path) -> Option<Fingerprint>,
    {
        let mut settled = Vec::new();
        let threshold = self.threshold;

        self.pending.retain(|path, write| {
            let Some(current) = stat(path) else {
                // Vanished while settling
                if write.kind != ChangeKind::Added {
                    settled.push(ChangeEvent::new(path.clone(), ChangeKind::Deleted));
                }
                return false;
            };

            if write.fingerprint != Some(current) {
                write.fingerprint = Some(current);
                write.stable_since = now;
                return true;
            }

            if now.duration_since(write.stable_since) >= threshold {
                settled.push(ChangeEvent::new(path.clone(), write.kind));
                return false;
            }
            true
        });

        settled.sort_by(|a, b| a.path.cmp(&b.path));
        settled
    }
}
