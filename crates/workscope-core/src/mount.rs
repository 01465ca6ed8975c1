//! Mount specifications handed to the sandbox runtime.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A host directory made visible at a path inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountSpec {
    /// Absolute path on the host.
    pub source: PathBuf,
    /// Absolute path inside the sandbox namespace.
    pub dest: PathBuf,
}

impl MountSpec {
    /// Mount with different host and sandbox paths.
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Mount at the same path on both sides.
    pub fn mirror(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::new(path, path)
    }

    /// Render as the `src:dest` value of a `-v` flag.
    pub fn volume_arg(&self) -> String {
        format!("{}:{}", self.source.display(), self.dest.display())
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.display(), self.dest.display())
    }
}

/// Drop repeated `(source, dest)` pairs, keeping the first occurrence of each.
pub fn dedupe_mounts(mounts: impl IntoIterator<Item = MountSpec>) -> Vec<MountSpec> {
    let mut seen = HashSet::new();
    mounts
        .into_iter()
        .filter(|mount| seen.insert(mount.clone()))
        .collect()
}

/// Expand mounts into `-v src:dest` argument pairs, in order.
pub fn flatten_mounts(mounts: &[MountSpec]) -> Vec<String> {
    mounts
        .iter()
        .flat_map(|mount| ["-v".to_string(), mount.volume_arg()])
        .collect()
}
