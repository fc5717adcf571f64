//! Changes accumulated during one debounce burst

use std::path::PathBuf;

use crate::{ChangeEvent, ChangeKind};

/// Maximum number of paths listed in a generated commit message body
const MAX_LISTED: usize = 20;

/// De-duplicated, first-seen ordered set of changes
#[derive(Debug, Default, Clone)]
pub struct ChangeBatch {
    entries: Vec<(PathBuf, ChangeKind)>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, merging it with an earlier event for the same path
    pub fn record(&mut self, event: &ChangeEvent) {
        let existing = self.entries.iter().position(|(path, _)| *path == event.path);

        match existing {
            Some(index) => match merge(self.entries[index].1, event.kind) {
                Some(kind) => self.entries[index].1 = kind,
                None => {
                    self.entries.remove(index);
                }
            },
            None => self.entries.push((event.path.clone(), event.kind)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain the batch into owned events
    pub fn take(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(path, kind)| ChangeEvent { path, kind })
            .collect()
    }

    /// Render `"<prefix>: <timestamp>"` plus one line per recorded change
    pub fn commit_message(&self, prefix: &str, timestamp: &str) -> String {
        let mut message = format!("{}: {}", prefix, timestamp);
        if self.entries.is_empty() {
            return message;
        }

        message.push('\n');
        for (path, kind) in self.entries.iter().take(MAX_LISTED) {
            message.push_str(&format!("\n{}: {}", kind, path.display()));
        }
        if self.entries.len() > MAX_LISTED {
            message.push_str(&format!("\n... and {} more", self.entries.len() - MAX_LISTED));
        }
        message
    }
}

/// Net effect of two consecutive changes to the same path
///
/// `None` means the changes cancel out (created then removed).
fn merge(earlier: ChangeKind, later: ChangeKind) -> Option<ChangeKind> {
    match (earlier, later) {
        (ChangeKind::Added, ChangeKind::Modified) => Some(ChangeKind::Added),
        (ChangeKind::Added, ChangeKind::Deleted) => None,
        (ChangeKind::Deleted, ChangeKind::Added) => Some(ChangeKind::Modified),
        (_, later) => Some(later),
    }
}
