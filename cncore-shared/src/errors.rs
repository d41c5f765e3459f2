//! Error taxonomy for cluster bootstrap.
//!
//! Nothing is recovered locally: every variant percolates to the top-level
//! run, which logs it and terminates the process with a non-zero status.

use std::fmt;

/// Result alias used across cn-core.
pub type CncoreResult<T> = Result<T, CncoreError>;

/// Details of an external command that ran and exited unsuccessfully.
#[derive(Debug, Clone)]
pub struct CommandFailureInfo {
    /// Full command line, program first.
    pub command: String,
    /// Exit status as reported by the OS (e.g. "exit status: 1").
    pub status: String,
    /// Standard output followed by standard error, verbatim.
    pub output: String,
}

impl fmt::Display for CommandFailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command [{}] executed and failed with {}",
            self.command, self.status
        )?;
        write!(f, "\n  output: {}", self.output)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CncoreError {
    /// Host environment cannot provide something we need (entropy, hostname).
    #[error("environment fault: {0}")]
    Environment(String),

    #[error("not enough memory: {actual} MiB available, at least {minimum} MiB required")]
    InsufficientMemory { minimum: u64, actual: u64 },

    #[error(
        "not enough space at {path}: {available} bytes available, at least {minimum} bytes required"
    )]
    InsufficientStorage {
        path: String,
        minimum: u64,
        available: u64,
    },

    #[error("failed to start execution of [{command}]: {source}")]
    CommandStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    CommandFailed(Box<CommandFailureInfo>),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Health stream could not be launched or exited unsuccessfully.
    #[error("health stream error: {0}")]
    Stream(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CncoreError {
    fn from(err: std::io::Error) -> Self {
        CncoreError::Filesystem(err.to_string())
    }
}

impl CncoreError {
    /// Whether the failure happened before any role executed.
    pub fn is_resource_insufficient(&self) -> bool {
        matches!(
            self,
            CncoreError::InsufficientMemory { .. } | CncoreError::InsufficientStorage { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_display_carries_output() {
        let err = CncoreError::CommandFailed(Box::new(CommandFailureInfo {
            command: "ceph-mon --mkfs -i toto".into(),
            status: "exit status: 1".into(),
            output: "monitor data directory is not empty".into(),
        }));

        let msg = err.to_string();
        assert!(msg.contains("[ceph-mon --mkfs -i toto]"));
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("monitor data directory is not empty"));
    }

    #[test]
    fn test_io_error_maps_to_filesystem() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CncoreError = io.into();
        assert!(matches!(err, CncoreError::Filesystem(_)));
    }

    #[test]
    fn test_resource_insufficient() {
        let err = CncoreError::InsufficientMemory {
            minimum: 512,
            actual: 511,
        };
        assert!(err.is_resource_insufficient());
        assert!(!CncoreError::Internal("x".into()).is_resource_insufficient());
    }
}
