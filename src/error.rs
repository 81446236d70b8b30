//! Error types for tierbox
//!
//! All modules use `TierboxResult<T>` as their return type. Best-effort
//! removals never produce one of these; they report through
//! [`crate::cleanup::CleanupResult`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tierbox operations
pub type TierboxResult<T> = Result<T, TierboxError>;

/// All errors that can occur in tierbox
#[derive(Error, Debug)]
pub enum TierboxError {
    // Environment errors
    #[error("Podman not found. Install it from https://podman.io")]
    PodmanNotFound,

    #[error("Unsupported platform: {0}. tierbox supports macOS and Linux.")]
    UnsupportedPlatform(String),

    // Configuration errors
    #[error("No project configuration found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Image errors
    #[error("Image build failed: {tag}:\n{reason}")]
    ImageBuild { tag: String, reason: String },

    #[error("Invalid image reference: {0}")]
    ImageReference(String),

    // Build state errors
    #[error("Failed to persist build state for {project}: {reason}")]
    StatePersist { project: String, reason: String },

    #[error("Failed to lock build state {path}: {source}")]
    StateLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Container errors
    #[error("Container failed to launch: {0}")]
    ContainerLaunch(String),

    #[error("Container exited with code {code}")]
    ContainerExited { code: i32 },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TierboxError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Process exit code to report for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ContainerExited { code } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: tierbox init"),
            Self::PodmanNotFound => Some("Install Podman, then run: podman info"),
            Self::ImageBuild { .. } => Some("Fix the package list in tierbox.toml and run again"),
            _ => None,
        }
    }
}
