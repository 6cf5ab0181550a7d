//! External tool runner.
//!
//! All media work is delegated to external processes (ffmpeg, ffprobe,
//! python scripts). `ToolCommand` runs them with a per-call timeout and
//! captured output, turning non-zero exits into typed errors.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Captured output of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builder for an external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Per-call timeout; external processes own their lifetime otherwise.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run to completion, failing on timeout or non-zero exit.
    pub async fn run(self) -> MediaResult<ToolOutput> {
        debug!(program = %self.program, args = ?self.args, "running external tool");

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(MediaError::Timeout {
                    tool: self.program,
                    timeout: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(MediaError::ToolFailed {
                tool: self.program,
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}
