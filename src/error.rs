//! Error type shared by the library side of glaunch.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when the launcher fails before the command is reached.
pub const EXIT_FAILURE: i32 = 1;
/// Shell convention for a command that exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Shell convention for a command that cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchError {
    /// The job specification is incomplete or inconsistent
    #[error("invalid job specification: {0}")]
    Validation(String),

    /// The working directory is missing or unusable
    #[error("working directory {}: {reason}", .path.display())]
    WorkDir { path: PathBuf, reason: String },

    /// The command could not be started
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command started but waiting on it failed
    #[error("failed to wait for {}: {source}", .program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A time limit, directive or job file could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// The scheduler refused or failed the submission
    #[error("scheduler `{scheduler}` rejected the job: {message}")]
    Scheduler { scheduler: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn scheduler(scheduler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scheduler {
            scheduler: scheduler.into(),
            message: message.into(),
        }
    }

    /// Process exit code reported when this error ends the job.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => EXIT_NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
                _ => EXIT_FAILURE,
            },
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn spawn_errors_follow_shell_exit_codes() {
        let not_found = LaunchError::Spawn {
            program: PathBuf::from("/nope/python"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(not_found.exit_code(), 127);

        let denied = LaunchError::Spawn {
            program: PathBuf::from("/etc/passwd"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(denied.exit_code(), 126);
    }

    #[test]
    fn environment_errors_exit_with_one() {
        let err = LaunchError::WorkDir {
            path: PathBuf::from("/missing"),
            reason: "does not exist".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("/missing"));
        assert_eq!(LaunchError::validation("x").exit_code(), 1);
    }
}
