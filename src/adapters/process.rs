//! External process runner.
//!
//! Spawns a command, captures stdout and stderr line by line and waits for
//! exit. Both streams are drained concurrently, so a chatty stderr cannot
//! stall the child while stdout is being read.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors from running an external process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
}

/// Captured output of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Standard output, one entry per line
    pub stdout: Vec<String>,

    /// Standard error, one entry per line
    pub stderr: Vec<String>,

    /// Exit code (None if killed by a signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Build output from literal stream contents (used by fakes and tests)
    pub fn from_streams(stdout: &str, stderr: &str) -> Self {
        Self {
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
            exit_code: Some(0),
        }
    }

    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// All lines, stdout first then stderr
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(String::as_str)
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Run a program to completion and capture both output streams
pub async fn run_captured(
    program: &str,
    args: &[String],
    limit: Option<Duration>,
) -> Result<ProcessOutput, ProcessError> {
    debug!(program, ?args, "Spawning process");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let wait = child.wait_with_output();
    let output = match limit {
        Some(limit) => timeout(limit, wait).await.map_err(|_| ProcessError::Timeout {
            program: program.to_string(),
            seconds: limit.as_secs(),
        })?,
        None => wait.await,
    }
    .map_err(|source| ProcessError::Wait {
        program: program.to_string(),
        source,
    })?;

    let captured = ProcessOutput {
        stdout: split_lines(&String::from_utf8_lossy(&output.stdout)),
        stderr: split_lines(&String::from_utf8_lossy(&output.stderr)),
        exit_code: output.status.code(),
    };

    for line in &captured.stdout {
        debug!(program, stream = "stdout", "{}", line);
    }
    for line in &captured.stderr {
        debug!(program, stream = "stderr", "{}", line);
    }

    Ok(captured)
}
