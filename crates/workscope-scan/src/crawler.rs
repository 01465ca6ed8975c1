//! Bounded, cycle-safe marker directory crawler.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use tokio::sync::broadcast;

use workscope_core::{CrawlConfig, ScanWarning, WarningKind, clean_path};

use crate::progress::CrawlProgress;
use crate::reader::{DirReader, EntryKind, FsReader};
use crate::visited::VisitedSet;

/// A directory waiting on the traversal stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalItem {
    pub directory: PathBuf,
    pub depth: u32,
}

/// Counters collected during a crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Directories successfully listed.
    pub dirs_read: u64,
    /// Directories that could not be listed.
    pub unreadable: u64,
    /// Stack items dropped because the path was already visited.
    pub revisits: u64,
    /// Children not enqueued because of a name rule.
    pub skipped_by_name: u64,
    /// Directories not read because of a prefix rule.
    pub skipped_by_prefix: u64,
    /// Directories not read because they were past the depth limit.
    pub skipped_by_depth: u64,
    /// Marker containers inspected.
    pub marker_probes: u64,
}

/// Result of a crawl.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Directories holding the marker. Treat as an unordered set.
    pub workspaces: IndexSet<PathBuf>,
    pub stats: CrawlStats,
    /// Missing roots, unreadable directories and failed marker probes.
    pub warnings: Vec<ScanWarning>,
    pub duration: Duration,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }
}

/// Depth-first crawler looking for `<dir>/<marker_container>/<marker>`.
///
/// Traversal runs on an explicit stack, one directory at a time. Symlinked
/// directories are never followed, marker containers are never descended
/// into, and listing failures only shrink the result.
pub struct MarkerCrawler<R = FsReader> {
    config: CrawlConfig,
    reader: R,
    progress_tx: broadcast::Sender<CrawlProgress>,
}

impl MarkerCrawler<FsReader> {
    /// Create a crawler over the real filesystem.
    pub fn new(config: CrawlConfig) -> Self {
        Self::with_reader(config, FsReader)
    }
}

impl<R: DirReader> MarkerCrawler<R> {
    /// Create a crawler with a custom directory reader.
    pub fn with_reader(config: CrawlConfig, reader: R) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            reader,
            progress_tx,
        }
    }

    /// Subscribe to crawl progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlProgress> {
        self.progress_tx.subscribe()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `roots` down to `max_depth` and return every workspace found.
    ///
    /// Roots sit at depth 0, so `max_depth == 0` lists the roots themselves
    /// and nothing below them. Roots must be absolute.
    pub fn discover<P: AsRef<Path>>(
        &self,
        roots: impl IntoIterator<Item = P>,
        max_depth: u32,
    ) -> Discovery {
        let start = Instant::now();
        let mut stats = CrawlStats::default();
        let mut warnings = Vec::new();
        let mut workspaces = IndexSet::new();
        let mut visited = VisitedSet::new();
        let mut stack: Vec<TraversalItem> = Vec::new();

        for root in roots {
            let root = root.as_ref();
            if !self.reader.exists(root) {
                tracing::warn!("Skipping missing root {}", root.display());
                warnings.push(ScanWarning::missing_root(root));
                continue;
            }
            stack.push(TraversalItem {
                directory: clean_path(root),
                depth: 0,
            });
        }

        while let Some(TraversalItem { directory, depth }) = stack.pop() {
            if !visited.insert(&directory) {
                stats.revisits += 1;
                continue;
            }
            if self.config.skip.matches_prefix(&directory) {
                stats.skipped_by_prefix += 1;
                continue;
            }
            if depth > max_depth {
                stats.skipped_by_depth += 1;
                continue;
            }

            let children = match self.reader.read_dir(&directory) {
                Ok(children) => children,
                Err(err) => {
                    tracing::debug!("Cannot read {}: {err}", directory.display());
                    stats.unreadable += 1;
                    warnings.push(ScanWarning::read_error(&directory, &err));
                    continue;
                }
            };
            stats.dirs_read += 1;

            for child in children {
                // Symlinks report their own kind and are dropped here with files
                if child.kind != EntryKind::Directory {
                    continue;
                }
                let name = child.name.to_string_lossy();
                let child_path = directory.join(&child.name);

                if self.config.is_marker_container(&name) {
                    stats.marker_probes += 1;
                    self.probe_marker(&directory, &child_path, &mut workspaces, &mut warnings);
                    continue;
                }

                if self.config.skip.matches_name(&name) {
                    stats.skipped_by_name += 1;
                    continue;
                }

                stack.push(TraversalItem {
                    directory: child_path,
                    depth: depth + 1,
                });
            }

            if stats.dirs_read.checked_rem(self.config.progress_interval) == Some(0) {
                let _ = self.progress_tx.send(CrawlProgress {
                    dirs_read: stats.dirs_read,
                    workspaces_found: workspaces.len() as u64,
                    current_path: directory.clone(),
                    errors_count: warnings.len() as u64,
                    elapsed: start.elapsed(),
                });
            }
        }

        Discovery {
            workspaces,
            stats,
            warnings,
            duration: start.elapsed(),
        }
    }

    /// Record `workspace` if `<container>/<marker>` is a directory.
    fn probe_marker(
        &self,
        workspace: &Path,
        container: &Path,
        workspaces: &mut IndexSet<PathBuf>,
        warnings: &mut Vec<ScanWarning>,
    ) {
        let marker_path = container.join(self.config.marker.as_str());
        match self.reader.is_dir(&marker_path) {
            Ok(true) => {
                if workspaces.insert(workspace.to_path_buf()) {
                    tracing::info!("Found {} directory at {}", self.config.marker, marker_path.display());
                }
            }
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(
                    "Failed to inspect potential {} directory {}: {err}",
                    self.config.marker,
                    marker_path.display()
                );
                warnings.push(marker_probe_warning(&marker_path, &err));
            }
        }
    }
}

fn marker_probe_warning(path: &Path, err: &io::Error) -> ScanWarning {
    ScanWarning::new(path, format!("Marker probe failed: {err}"), WarningKind::MarkerProbe)
}
