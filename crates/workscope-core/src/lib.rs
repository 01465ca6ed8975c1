//! Core types and configuration for workscope.
//!
//! This crate provides the data structures shared by the crawler, the
//! registry and the mount planner: crawl configuration and skip rules,
//! path normalization, mount specifications and the workspace record file.

mod config;
mod env;
mod error;
mod mount;
mod path;
mod record;

pub use config::{CrawlConfig, CrawlConfigBuilder, DEFAULT_MAX_DEPTH, SkipRules};
pub use env::{EnvSnapshot, Platform, vars};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use mount::{MountSpec, dedupe_mounts, flatten_mounts};
pub use path::{DRIVE_MOUNT_PREFIX, absolutize, clean_path, normalize_input_path, split_roots_input};
pub use record::{RECORD_VERSION, RegistrationSummary, WorkspaceEntry, WorkspacesFile};
