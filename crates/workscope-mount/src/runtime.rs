//! Container runtime commands.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::PlanError;

/// What a runtime command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit status as reported by the OS, for messages.
    pub status: String,
    /// Empty unless output was captured.
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful command with captured stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed command.
    pub fn failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Something that runs container CLI commands.
pub trait ContainerRuntime {
    /// Program name used in messages.
    fn program(&self) -> &str;

    /// Run one command. When `capture` is false output goes to the terminal.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not as an error.
    fn run(&self, args: &[String], capture: bool) -> Result<CommandOutput, PlanError>;
}

/// Runs the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
    name: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different docker-compatible binary (`podman`, a full path).
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program.to_string_lossy().into_owned();
        Self { program, name }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for DockerCli {
    fn program(&self) -> &str {
        &self.name
    }

    fn run(&self, args: &[String], capture: bool) -> Result<CommandOutput, PlanError> {
        tracing::debug!("{} {}", self.name, args.join(" "));
        let mut command = Command::new(&self.program);
        command.args(args);

        let spawn_error = |source| PlanError::Spawn {
            program: self.name.clone(),
            source,
        };

        if capture {
            let output = command
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_error)?;
            Ok(CommandOutput {
                success: output.status.success(),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = command.status().map_err(spawn_error)?;
            Ok(CommandOutput {
                success: status.success(),
                status: status.to_string(),
                ..CommandOutput::default()
            })
        }
    }
}
