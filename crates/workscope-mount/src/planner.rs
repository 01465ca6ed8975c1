//! Narrowed mount planning.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use workscope_core::{MountSpec, ScanWarning};

use crate::namespace::NamespaceMap;

/// Why a plan fell back to the wide mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    /// Discovery found nothing.
    NothingDiscovered,
    /// Every discovered path was missing on the host.
    NoHostPaths,
}

/// Mounts for the narrowed sandbox.
#[derive(Debug, Clone, Serialize)]
pub struct MountPlan {
    /// Mounts in the order they should be passed to the runtime.
    pub mounts: Vec<MountSpec>,
    /// Discovered paths dropped because their host path does not exist.
    pub dropped: Vec<ScanWarning>,
    /// Set when `mounts` is the wide mount list.
    pub fallback: Option<FallbackReason>,
}

impl MountPlan {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Computes the minimal mount list from discovered scan-namespace paths.
#[derive(Debug, Clone)]
pub struct MountPlanner {
    namespace: NamespaceMap,
    host_exists: fn(&Path) -> bool,
}

impl MountPlanner {
    /// Planner for the default `/host` layout checking the real filesystem.
    pub fn new() -> Self {
        Self::with_namespace(NamespaceMap::default())
    }

    pub fn with_namespace(namespace: NamespaceMap) -> Self {
        Self {
            namespace,
            host_exists: Path::exists,
        }
    }

    /// Replace the host existence check.
    pub fn with_host_probe(mut self, host_exists: fn(&Path) -> bool) -> Self {
        self.host_exists = host_exists;
        self
    }

    /// Plan mounts for `discovered`, or return `wide` unchanged when nothing usable was found.
    pub fn plan<P: AsRef<Path>>(
        &self,
        discovered: impl IntoIterator<Item = P>,
        wide: &[MountSpec],
    ) -> MountPlan {
        let mut dropped = Vec::new();
        let mut mounts = Vec::new();
        let mut hosts = HashSet::new();
        let mut any_discovered = false;

        for scan_path in discovered {
            any_discovered = true;
            let mount = self.namespace.mapping(scan_path.as_ref());
            if !(self.host_exists)(&mount.source) {
                tracing::warn!("Skipping missing host path {}", mount.source.display());
                dropped.push(ScanWarning::missing_host_path(&mount.source));
                continue;
            }
            // One mount per host path; the first spelling seen wins
            if hosts.insert(mount.source.clone()) {
                mounts.push(mount);
            }
        }

        let fallback = if !any_discovered {
            Some(FallbackReason::NothingDiscovered)
        } else if mounts.is_empty() {
            Some(FallbackReason::NoHostPaths)
        } else {
            None
        };

        match fallback {
            Some(reason) => {
                tracing::warn!("No workspace mounts planned ({reason:?}); keeping wide mounts");
                MountPlan {
                    mounts: wide.to_vec(),
                    dropped,
                    fallback,
                }
            }
            None => MountPlan {
                mounts,
                dropped,
                fallback,
            },
        }
    }
}

impl Default for MountPlanner {
    fn default() -> Self {
        Self::new()
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

    fn wide() -> Vec<MountSpec> {
        vec![MountSpec::new("/", "/host"), MountSpec::mirror("/mnt/c")]
    }

    #[test]
    fn test_translates_each_form() {
        let planner = MountPlanner::new().with_host_probe(always);
        let plan = planner.plan(["/host", "/host/home/me/p", "/mnt/c/code"], &wide());

        assert_eq!(
            plan.mounts,
            vec![
                MountSpec::new("/", "/host"),
                MountSpec::new("/home/me/p", "/host/home/me/p"),
                MountSpec::mirror("/mnt/c/code"),
            ]
        );
        assert!(!plan.is_fallback());
    }

    #[test]
    fn test_empty_discovery_returns_wide_unchanged() {
        let planner = MountPlanner::new().with_host_probe(always);
        let plan = planner.plan(Vec::<&str>::new(), &wide());

        assert_eq!(plan.mounts, wide());
        assert_eq!(plan.fallback, Some(FallbackReason::NothingDiscovered));
    }

    #[test]
    fn test_missing_host_paths_are_dropped() {
        let planner = MountPlanner::new().with_host_probe(never);
        let plan = planner.plan(["/host/gone", "/mnt/c/gone"], &wide());

        assert_eq!(plan.dropped.len(), 2);
        assert_eq!(plan.fallback, Some(FallbackReason::NoHostPaths));
        assert_eq!(plan.mounts, wide());
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let planner = MountPlanner::new().with_host_probe(always);
        let plan = planner.plan(["/host/b", "/host/a", "/host/b", "/host/b/"], &wide());

        assert_eq!(
            plan.mounts,
            vec![
                MountSpec::new("/b", "/host/b"),
                MountSpec::new("/a", "/host/a"),
            ]
        );
    }

    #[test]
    fn test_one_mount_per_host_path() {
        let planner = MountPlanner::new().with_host_probe(always);
        let plan = planner.plan(["/host/mnt/c/x", "/mnt/c/x", "/host/mnt/c/y"], &wide());

        assert_eq!(
            plan.mounts,
            vec![
                MountSpec::new("/mnt/c/x", "/host/mnt/c/x"),
                MountSpec::new("/mnt/c/y", "/host/mnt/c/y"),
            ]
        );
    }
}
