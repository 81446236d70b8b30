//! Outcome of best-effort removals
//!
//! Removing a superseded image, a leftover container or a stale cache path
//! may fail without affecting the next run. Such failures are logged and
//! never propagated.

use std::fmt;
use tracing::{debug, warn};

/// Result of a best-effort cleanup step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// The artifact was removed
    Done { action: String },
    /// Nothing to remove
    Skipped { action: String },
    /// Removal failed; residue is left behind
    Failed { action: String, cause: String },
}

impl CleanupResult {
    pub fn done(action: impl Into<String>) -> Self {
        Self::Done {
            action: action.into(),
        }
    }

    pub fn skipped(action: impl Into<String>) -> Self {
        Self::Skipped {
            action: action.into(),
        }
    }

    pub fn failed(action: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Failed {
            action: action.into(),
            cause: cause.to_string(),
        }
    }

    /// Fold a fallible removal into a cleanup outcome.
    pub fn from_result<E: fmt::Display>(action: impl Into<String>, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::done(action),
            Err(e) => Self::failed(action, e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Log the outcome and hand it back.
    pub fn log(self) -> Self {
        match &self {
            Self::Done { action } => debug!("{}: done", action),
            Self::Skipped { action } => debug!("{}: nothing to do", action),
            Self::Failed { action, cause } => warn!("{} failed (ignored): {}", action, cause),
        }
        self
    }
}

impl fmt::Display for CleanupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done { action } => write!(f, "{}", action),
            Self::Skipped { action } => write!(f, "{} (skipped)", action),
            Self::Failed { action, cause } => write!(f, "{} failed: {}", action, cause),
        }
    }
}
