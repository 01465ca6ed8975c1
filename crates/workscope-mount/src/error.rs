//! Error types for planning and orchestration.

use thiserror::Error;

/// Errors that stop the mount plan or the setup sequence.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Not even one wide mount could be established.
    #[error("No scan mounts available. Provide AGENT_SCAN_ROOTS or ensure / and /mnt/ drives exist.")]
    NoMountsAvailable,

    /// A runtime command exited unsuccessfully.
    #[error("`{command}` failed with {status}{}", stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The runtime binary could not be started.
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        trimmed => format!(": {trimmed}"),
    }
}
