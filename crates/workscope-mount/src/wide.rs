//! Wide mounts for the scanning sandbox.

use std::path::{Path, PathBuf};

use workscope_core::{EnvSnapshot, MountSpec, dedupe_mounts, split_roots_input, vars};

use crate::error::PlanError;
use crate::namespace::NamespaceMap;

/// Drive mounts exposed to the scanner when present.
pub const WIDE_DRIVE_MOUNTS: &[&str] = &["/mnt/c", "/mnt/d", "/mnt/e", "/mnt/f", "/mnt/g"];

/// Establishes the coarse mounts used only during discovery.
#[derive(Debug, Clone)]
pub struct WideMountDetector {
    namespace: NamespaceMap,
    env: EnvSnapshot,
    drive_mounts: Vec<PathBuf>,
    exists: fn(&Path) -> bool,
}

impl WideMountDetector {
    pub fn new(env: EnvSnapshot) -> Self {
        Self {
            namespace: NamespaceMap::default(),
            env,
            drive_mounts: WIDE_DRIVE_MOUNTS.iter().map(PathBuf::from).collect(),
            exists: Path::exists,
        }
    }

    pub fn with_namespace(mut self, namespace: NamespaceMap) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_drive_mounts(mut self, drive_mounts: Vec<PathBuf>) -> Self {
        self.drive_mounts = drive_mounts;
        self
    }

    /// Replace the existence check.
    pub fn with_probe(mut self, exists: fn(&Path) -> bool) -> Self {
        self.exists = exists;
        self
    }

    /// The host root at the sentinel, then root-list entries and drive
    /// mounts mirrored, deduplicated.
    ///
    /// Fails when nothing at all can be mounted.
    pub fn detect(&self) -> Result<Vec<MountSpec>, PlanError> {
        let mut mounts = Vec::new();

        if (self.exists)(Path::new("/")) {
            mounts.push(self.namespace.root_mount());
        }

        for key in [vars::SCAN_ROOTS, vars::SCAN_EXTRA_ROOTS] {
            let raw = self.env.get(key).unwrap_or_default();
            mounts.extend(
                split_roots_input(raw)
                    .iter()
                    .map(PathBuf::from)
                    .filter(|path| (self.exists)(path))
                    .map(MountSpec::mirror),
            );
        }

        mounts.extend(
            self.drive_mounts
                .iter()
                .filter(|path| (self.exists)(path))
                .map(MountSpec::mirror),
        );

        let mounts = dedupe_mounts(mounts);
        if mounts.is_empty() {
            return Err(PlanError::NoMountsAvailable);
        }
        Ok(mounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: &Path) -> bool {
        true
    }

    fn never(_: &Path) -> bool {
        false
    }

    #[test]
    fn test_detect_order_and_dedupe() {
        let env = EnvSnapshot::from_pairs([
            (vars::SCAN_ROOTS, "/srv/code, /mnt/c"),
            (vars::SCAN_EXTRA_ROOTS, "/opt/extra"),
        ]);
        let mounts = WideMountDetector::new(env)
            .with_drive_mounts(vec![PathBuf::from("/mnt/c"), PathBuf::from("/mnt/d")])
            .with_probe(always)
            .detect()
            .unwrap();

        assert_eq!(
            mounts,
            vec![
                MountSpec::new("/", "/host"),
                MountSpec::mirror("/srv/code"),
                MountSpec::mirror("/mnt/c"),
                MountSpec::mirror("/opt/extra"),
                MountSpec::mirror("/mnt/d"),
            ]
        );
    }

    #[test]
    fn test_nothing_available_is_fatal() {
        let result = WideMountDetector::new(EnvSnapshot::default())
            .with_probe(never)
            .detect();
        assert!(matches!(result, Err(PlanError::NoMountsAvailable)));
    }
}
