//! Crawl configuration and skip rules.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Depth used when neither the command line nor the environment provide a valid one.
pub const DEFAULT_MAX_DEPTH: u32 = 8;

const DEFAULT_SKIP_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    ".hg",
    ".svn",
    ".cache",
    ".workscope",
    ".config",
    ".vscode",
    ".idea",
    ".Trash",
    "__pycache__",
    "venv",
    ".venv",
    "Library",
    "System Volume Information",
    "$Recycle.Bin",
    "ProgramData",
    "Program Files",
    "Program Files (x86)",
];

const DEFAULT_SKIP_PREFIXES: &[&str] = &[
    "/proc",
    "/sys",
    "/dev",
    "/run",
    "/var/lib/docker",
    "/var/lib/containerd",
    "/var/lib/snapd",
    "/var/log",
];

/// Directories the crawler never descends into.
///
/// Name rules are compared case-insensitively against the final path
/// segment. Prefix rules match a path equal to the prefix or nested below
/// it; the filesystem root itself never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRules {
    names: HashSet<CompactString>,
    prefixes: Vec<PathBuf>,
}

impl SkipRules {
    /// Rules with no names and no prefixes.
    pub fn empty() -> Self {
        Self {
            names: HashSet::new(),
            prefixes: Vec::new(),
        }
    }

    /// Add a directory name rule.
    pub fn with_name(mut self, name: &str) -> Self {
        self.names.insert(CompactString::new(name.to_lowercase()));
        self
    }

    /// Add an absolute prefix rule.
    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Check a directory name against the name rules.
    pub fn matches_name(&self, name: &str) -> bool {
        self.names.contains(name.to_lowercase().as_str())
    }

    /// Check an absolute path against the prefix rules.
    pub fn matches_prefix(&self, path: &Path) -> bool {
        if path.parent().is_none() {
            return false;
        }
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        let rules = DEFAULT_SKIP_NAMES
            .iter()
            .fold(Self::empty(), |rules, name| rules.with_name(name));
        DEFAULT_SKIP_PREFIXES
            .iter()
            .fold(rules, |rules, prefix| rules.with_prefix(prefix))
    }
}

/// Configuration for a workspace crawl.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CrawlConfig {
    /// Name of the directory that may hold the marker (`.claude`).
    #[builder(default = "CompactString::const_new(\".claude\")")]
    pub marker_container: CompactString,

    /// Name of the marker directory inside the container (`agents`).
    #[builder(default = "CompactString::const_new(\"agents\")")]
    pub marker: CompactString,

    /// Name and prefix rules for subtrees that are never read.
    #[builder(default)]
    #[serde(default)]
    pub skip: SkipRules,

    /// Publish a progress snapshot every this many directory reads.
    #[builder(default = "256")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_progress_interval() -> u64 {
    256
}

impl CrawlConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("marker_container", &self.marker_container),
            ("marker", &self.marker),
        ] {
            if let Some(name) = value {
                if name.is_empty() {
                    return Err(format!("{field} cannot be empty"));
                }
                if name.contains(['/', '\\']) {
                    return Err(format!("{field} must be a single path segment"));
                }
            }
        }
        if self.progress_interval == Some(0) {
            return Err("progress_interval must be positive".to_string());
        }
        Ok(())
    }
}

impl CrawlConfig {
    /// Create a new config builder.
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::default()
    }

    /// Whether a directory name is the marker container.
    pub fn is_marker_container(&self, name: &str) -> bool {
        self.marker_container.as_str() == name
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            marker_container: CompactString::const_new(".claude"),
            marker: CompactString::const_new("agents"),
            skip: SkipRules::default(),
            progress_interval: default_progress_interval(),
        }
    }
}
