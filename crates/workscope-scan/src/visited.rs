//! Visited-directory tracking for cycle safety.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directories already taken off the traversal stack.
///
/// A path is inserted at most once and never traversed again, even when
/// it is reachable through another root or a second spelling of the walk.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<PathBuf>,
}

impl VisitedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Mark a directory visited. Returns `true` if this is the first visit.
    pub fn insert(&mut self, dir: &Path) -> bool {
        if self.seen.contains(dir) {
            return false;
        }
        self.seen.insert(dir.to_path_buf())
    }

    /// Check if a directory has been visited (without marking it).
    pub fn contains(&self, dir: &Path) -> bool {
        self.seen.contains(dir)
    }

    /// Get the number of visited directories.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been visited.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
