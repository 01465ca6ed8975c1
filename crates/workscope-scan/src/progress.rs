//! Crawl progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information during a crawl.
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    /// Number of directories listed so far.
    pub dirs_read: u64,
    /// Number of workspaces found so far.
    pub workspaces_found: u64,
    /// Directory most recently listed.
    pub current_path: PathBuf,
    /// Number of unreadable directories and failed marker probes.
    pub errors_count: u64,
    /// Time elapsed since the crawl started.
    pub elapsed: Duration,
}

impl CrawlProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            dirs_read: 0,
            workspaces_found: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate crawl rate in directories per second.
    pub fn dirs_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.dirs_read as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for CrawlProgress {
    fn default() -> Self {
        Self::new()
    }
}
