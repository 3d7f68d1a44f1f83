// ── Core error types ──
//
// Fetch failures are recorded on the node they belong to and never
// propagate up or down the tree. `CoreError` is reserved for misuse of
// the path-addressed API and for configuration problems.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::model::NodePath;

/// Failure reported by a `NodeFetcher` for one path.
///
/// Stored verbatim as the `Failed` state of the node that was being
/// expanded. Carries only a human-readable message so it can be cloned
/// into snapshots and shown by any host.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fetcher did not resolve within the configured timeout.
    pub fn timed_out(after: Duration) -> Self {
        Self::new(format!("fetch timed out after {}ms", after.as_millis()))
    }

    /// Wrap any displayable error.
    pub fn from_display(err: impl std::fmt::Display) -> Self {
        Self::new(err.to_string())
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A prefix of the path is not `Loaded`, or the final key does not
    /// name an existing node. Signals a consumer bug, not a user-facing
    /// condition.
    #[error("path not found: '{path}'")]
    PathNotFound { path: NodePath },

    /// `NodeFetcher` failed for `path`. Returned only by operations whose
    /// caller asked for the error explicitly; the node itself records
    /// `Failed`.
    #[error("fetch failed for '{path}': {cause}")]
    FetchFailed { path: NodePath, cause: FetchError },

    /// Breadcrumb level beyond the active path.
    #[error("breadcrumb level {level} is deeper than the active path ({depth} levels)")]
    InvalidLevel { level: usize, depth: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn path_not_found(path: &NodePath) -> Self {
        Self::PathNotFound { path: path.clone() }
    }

    /// Returns `true` for errors that indicate a consumer bug rather than
    /// a runtime condition.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::PathNotFound { .. } | Self::InvalidLevel { .. })
    }
}
