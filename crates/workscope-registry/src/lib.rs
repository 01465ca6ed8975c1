//! Workspace registry for workscope.
//!
//! Persists discovered workspaces to a versioned JSON record file so that
//! the mount planner, possibly running in a different process or sandbox,
//! can read them back.
//!
//! ```rust,no_run
//! use workscope_registry::WorkspaceRegistry;
//!
//! let mut registry = WorkspaceRegistry::open("/root/.workscope/workspaces.json").unwrap();
//! let summary = registry.register_bulk(["/srv/proj"]).unwrap();
//! println!("added {} (updated {}, skipped {})", summary.added, summary.updated, summary.skipped);
//! ```

mod registry;

pub use registry::{RECORD_FILE_NAME, WorkspaceRegistry, default_record_path};

// Re-export core types
pub use workscope_core::{
    RegistrationSummary, ScanWarning, WarningKind, WorkspaceEntry, WorkspacesFile,
};
