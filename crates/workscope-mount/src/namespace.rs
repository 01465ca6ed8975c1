//! Translation between the scan namespace and the host.

use std::path::{Path, PathBuf};

use workscope_core::MountSpec;

/// Where the host root is mounted inside the scanning sandbox.
pub const HOST_ROOT_SENTINEL: &str = "/host";

/// Inverse of the wide mount layout.
///
/// The host root is mounted at the sentinel, so the sentinel maps back to
/// `/` and anything below it maps to the path with the sentinel stripped.
/// Every other path is mounted identically on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMap {
    sentinel: PathBuf,
}

impl NamespaceMap {
    pub fn new(sentinel: impl Into<PathBuf>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// The wide mount exposing the host root at the sentinel.
    pub fn root_mount(&self) -> MountSpec {
        MountSpec::new("/", &self.sentinel)
    }

    /// Host path behind a scan-namespace path.
    pub fn to_host(&self, scan_path: &Path) -> PathBuf {
        match scan_path.strip_prefix(&self.sentinel) {
            Ok(rest) => Path::new("/").join(rest),
            Err(_) => scan_path.to_path_buf(),
        }
    }

    /// Mount exposing a scan-namespace path at the same place in the next sandbox.
    pub fn mapping(&self, scan_path: &Path) -> MountSpec {
        MountSpec::new(self.to_host(scan_path), scan_path)
    }
}

impl Default for NamespaceMap {
    fn default() -> Self {
        Self::new(HOST_ROOT_SENTINEL)
    }
}
