use async_trait::async_trait;
use std::io;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from driving the external device-control tool
#[derive(Debug, Error)]
pub enum SimctlError {
    /// The external program could not be spawned at all
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The command ran but exited unsuccessfully
    #[error("`{command}` exited with code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Device-list output was not valid JSON
    #[error("device list output is not valid JSON: {0}")]
    UnparseableOutput(#[from] serde_json::Error),
}

/// Captured result of one external command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,

    /// Raw standard output
    pub stdout: Vec<u8>,

    /// Raw standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stderr as trimmed text, for error reporting
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// One external-process invocation boundary.
///
/// Both collaborators that shell out (device listing and location setting)
/// go through this trait, so they share spawn and error handling and so
/// tests can script the external tool:
/// - `ProcessRunner` spawns the real tool
/// - `MockRunner` replays scripted outputs and records calls
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the tool once with the given arguments and wait for it to exit
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, SimctlError>;
}

/// Invokes the real external tool via `tokio::process`
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The standard entry point for simulator control on macOS
    pub fn xcrun() -> Self {
        Self::new("xcrun")
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, SimctlError> {
        debug!("running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| SimctlError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
