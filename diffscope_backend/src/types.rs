use chrono::{DateTime, Utc};
use diffscope_api::{ChangeKind, ChangePath, LineStats};

/// A path change as reported by the backend, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// Before/after paths.
    pub path: ChangePath,
    /// Kind of transition.
    pub kind: ChangeKind,
    /// Line counts from the patch; meaningless when `is_binary`.
    pub lines: LineStats,
    /// Content probe result.
    pub is_binary: bool,
}

impl RawChange {
    /// A newly added text file.
    pub fn added(path: impl Into<String>, lines: u64) -> Self {
        Self {
            path: ChangePath::new("", path),
            kind: ChangeKind::Added,
            lines: LineStats::new(lines, 0),
            is_binary: false,
        }
    }

    /// A modified text file.
    pub fn modified(path: impl Into<String>, added: u64, deleted: u64) -> Self {
        let path = path.into();
        Self {
            path: ChangePath::new(path.clone(), path),
            kind: ChangeKind::Modified,
            lines: LineStats::new(added, deleted),
            is_binary: false,
        }
    }

    /// A deleted text file.
    pub fn deleted(path: impl Into<String>, lines: u64) -> Self {
        Self {
            path: ChangePath::new(path, ""),
            kind: ChangeKind::Deleted,
            lines: LineStats::new(0, lines),
            is_binary: false,
        }
    }

    /// A renamed text file.
    pub fn renamed(
        before: impl Into<String>,
        after: impl Into<String>,
        added: u64,
        deleted: u64,
    ) -> Self {
        Self {
            path: ChangePath::new(before, after),
            kind: ChangeKind::Renamed,
            lines: LineStats::new(added, deleted),
            is_binary: false,
        }
    }

    /// Mark the change as binary content.
    #[must_use]
    pub const fn binary(mut self) -> Self {
        self.is_binary = true;
        self
    }
}

/// A commit as read from the backend log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    /// Full commit hash.
    pub hash: String,
    /// Author display name.
    pub author: String,
    /// Author timestamp.
    pub timestamp: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
    /// Number of parents.
    pub parent_count: usize,
}

impl RawCommit {
    /// More than one parent.
    pub const fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Order in which the backend walks the commit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOrder {
    /// Most recent first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Errors surfaced by backend implementations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The reference does not name a commit.
    #[error("reference not found: {reference}")]
    RefNotFound {
        /// Reference as supplied.
        reference: String,
    },
    /// An object id is not present in the store.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// Missing object id.
        oid: String,
    },
    /// The store cannot be opened or read at all.
    #[error("repository unavailable: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
    },
    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
    /// Any other backend failure.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl BackendError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
