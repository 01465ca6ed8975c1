//! The versioned workspace record file.

use std::path::{Path, PathBuf};

use chrono::Utc;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Current record file version.
pub const RECORD_VERSION: u32 = 1;

/// A discovered workspace as stored in the record file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEntry {
    /// Absolute path of the directory holding the marker.
    pub path: PathBuf,
    /// Display name, the final path segment.
    pub name: CompactString,
    /// When the workspace was last discovered, in epoch milliseconds.
    pub last_seen: i64,
}

impl WorkspaceEntry {
    /// Create an entry named after the final segment of `path`.
    pub fn new(path: impl Into<PathBuf>, last_seen: i64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        Self {
            path,
            name,
            last_seen,
        }
    }

    /// Create an entry stamped with the current time.
    pub fn seen_now(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Utc::now().timestamp_millis())
    }
}

/// `{ version, workspaces: [...] }` as written by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacesFile {
    pub version: u32,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceEntry>,
}

impl Default for WorkspacesFile {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            workspaces: Vec::new(),
        }
    }
}

impl WorkspacesFile {
    /// Parse strictly.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Parse, treating blank or malformed input as an empty record set.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match Self::parse(raw) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("Failed to parse workspaces file: {err}");
                Self::default()
            }
        }
    }

    /// Find an entry by path.
    pub fn find(&self, path: &Path) -> Option<&WorkspaceEntry> {
        self.workspaces.iter().find(|entry| entry.path == path)
    }

    /// Paths of all recorded workspaces, in file order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.workspaces.iter().map(|entry| entry.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}

/// Outcome of registering a batch of discovered workspaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}
