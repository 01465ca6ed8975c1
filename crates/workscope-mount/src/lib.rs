//! Mount narrowing for workscope.
//!
//! Discovery runs inside a disposable sandbox that sees the whole host
//! through a few wide mounts (`/` at `/host`, drive mounts at `/mnt/<x>`).
//! This crate translates the paths found there back to host paths and
//! builds the minimal mount list for the real workload.
//!
//! # Overview
//!
//! - [`NamespaceMap`] inverts the wide mount layout (`/host/x` is host `/x`)
//! - [`MountPlanner`] turns discovered paths into a deduplicated mount list,
//!   falling back to the wide mounts when nothing usable was found
//! - [`WideMountDetector`] establishes the wide mounts for the scan phase
//! - [`SetupPipeline`] drives the scan-then-narrow sequence against a
//!   [`ContainerRuntime`] such as [`DockerCli`]
//!
//! ```rust,no_run
//! use workscope_mount::{MountPlanner, MountSpec};
//!
//! let wide = vec![MountSpec::new("/", "/host")];
//! let plan = MountPlanner::new().plan(["/host/home/me/proj"], &wide);
//! for mount in &plan.mounts {
//!     println!("-v {}", mount.volume_arg());
//! }
//! ```

mod error;
mod namespace;
mod planner;
mod runtime;
mod setup;
mod wide;

pub use error::PlanError;
pub use namespace::{HOST_ROOT_SENTINEL, NamespaceMap};
pub use planner::{FallbackReason, MountPlan, MountPlanner};
pub use runtime::{CommandOutput, ContainerRuntime, DockerCli};
pub use setup::{SetupConfig, SetupPipeline, SetupReport};
pub use wide::{WIDE_DRIVE_MOUNTS, WideMountDetector};

// Re-export core types
pub use workscope_core::{MountSpec, ScanWarning, WorkspacesFile, dedupe_mounts, flatten_mounts};
