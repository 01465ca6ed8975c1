//! Workspace discovery for workscope.
//!
//! This crate finds directories that contain a marker subdirectory
//! (`<dir>/.claude/agents`) without walking the whole filesystem.
//!
//! # Overview
//!
//! - **Root resolution** from command line, environment or platform defaults
//! - **Iterative traversal** with an explicit stack, never recursion
//! - **Two-tier skipping**: name rules before enqueueing, prefix rules before reading
//! - **Cycle safety**: symlinks are never followed and each path is visited once
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use workscope_scan::{CrawlConfig, EnvSnapshot, MarkerCrawler, Platform, RootResolver};
//!
//! let resolver = RootResolver::new(
//!     Platform::current(),
//!     EnvSnapshot::capture(),
//!     std::env::current_dir().unwrap(),
//!     "/home/me".into(),
//! );
//! let resolved = resolver.resolve(&[], None);
//!
//! let crawler = MarkerCrawler::new(CrawlConfig::default());
//! let discovery = crawler.discover(&resolved.roots, resolved.max_depth);
//!
//! for workspace in &discovery.workspaces {
//!     println!("{}", workspace.display());
//! }
//! ```

mod crawler;
mod progress;
mod reader;
mod roots;
mod visited;

pub use crawler::{CrawlStats, Discovery, MarkerCrawler, TraversalItem};
pub use progress::CrawlProgress;
pub use reader::{ChildEntry, DirReader, EntryKind, FsReader};
pub use roots::{POSIX_MOUNT_CANDIDATES, ResolvedRoots, RootResolver, parse_max_depth};
pub use visited::VisitedSet;

// Re-export core types for convenience
pub use workscope_core::{
    CrawlConfig, DEFAULT_MAX_DEPTH, EnvSnapshot, Platform, ScanWarning, SkipRules, WarningKind,
    vars,
};
