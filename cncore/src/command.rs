//! External daemon invocation.
//!
//! Every role step talks to Ceph through a [`CommandRunner`]. The host
//! implementation shells out with tokio; a non-zero exit or a spawn failure
//! is fatal and carries the command line plus its combined output.

use async_trait::async_trait;
use cncore_shared::errors::{CncoreError, CncoreResult, CommandFailureInfo};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// A fully-resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits ours when unset.
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
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

    /// Append a path argument.
    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub(crate) fn to_tokio(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        let mut out = String::from_utf8_lossy(&self.stdout).into_owned();
        out.push_str(&String::from_utf8_lossy(&self.stderr));
        out
    }
}

/// Launches external daemon-management commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// Returns `CommandStart` if it cannot be launched and `CommandFailed`
    /// if it exits unsuccessfully.
    async fn run(&self, invocation: &Invocation) -> CncoreResult<CommandOutput>;

    /// Launch `invocation` as a detached task and return its PID.
    ///
    /// The caller does not own or observe the process after launch: it is
    /// never waited on, its output is discarded, and it keeps running if the
    /// orchestrator exits.
    fn spawn_detached(&self, invocation: &Invocation) -> CncoreResult<u32>;
}

/// Runs commands on the local host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostRunner;

#[async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, invocation: &Invocation) -> CncoreResult<CommandOutput> {
        tracing::debug!(command = %invocation, "Executing");

        let output = invocation
            .to_tokio()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CncoreError::CommandStart {
                command: invocation.to_string(),
                source,
            })?;

        let captured = CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !output.status.success() {
            let combined = captured.combined();
            tracing::error!(
                command = %invocation,
                status = %output.status,
                output = %combined,
                "Command failed"
            );
            return Err(CncoreError::CommandFailed(Box::new(CommandFailureInfo {
                command: invocation.to_string(),
                status: output.status.to_string(),
                output: combined,
            })));
        }

        Ok(captured)
    }

    fn spawn_detached(&self, invocation: &Invocation) -> CncoreResult<u32> {
        let mut cmd = invocation.to_tokio();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        let child = cmd.spawn().map_err(|source| {
            tracing::error!(command = %invocation, error = %source, "Failed to launch");
            CncoreError::CommandStart {
                command: invocation.to_string(),
                source,
            }
        })?;

        // Dropping the handle detaches it; tokio reaps it in the background.
        child.id().ok_or_else(|| {
            CncoreError::Internal(format!("[{}] exited before reporting a pid", invocation))
        })
    }
}
