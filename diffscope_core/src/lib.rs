//! Core library for diffscope's change reports.
//!
//! The crate is layered around four responsibilities:
//! - classifying and filtering the paths a tree diff reports
//! - choosing the baseline that scopes the commit history
//! - orchestrating the report pipeline against a [`VcsBackend`]
//! - the libgit2-backed [`repository::GitBackend`] and JSON presentation
//!
//! [`VcsBackend`]: diffscope_backend::VcsBackend

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

use std::fmt;

/// Baseline selection between two revisions.
pub mod baseline;
/// Path classification tables and rules.
pub mod classify;
/// Environment variable names and exclusion-list cleanup.
pub mod config;
/// Exclusion rules over paths.
pub mod filter;
/// Forge URL derivation.
pub mod links;
/// Report pipeline orchestration.
pub mod pipeline;
/// JSON presentation of reports.
pub mod presenter;
/// Git repository access built on top of libgit2.
pub mod repository;

pub use diffscope_api::*;
pub use diffscope_backend::{
    BackendError, BackendOp, Cancellation, LogOrder, MemoryBackend, RawChange, RawCommit,
    VcsBackend,
};
pub use pipeline::{generate_report, ReportPipeline};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolving `from`/`to` references.
    ResolveRefs,
    /// Ancestry and merge-base queries.
    Baseline,
    /// Tree diff between the endpoints.
    TreeDiff,
    /// Commit history walk.
    History,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResolveRefs => "resolve refs",
            Self::Baseline => "baseline",
            Self::TreeDiff => "tree diff",
            Self::History => "history",
        })
    }
}

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reference could not be resolved to a commit.
    #[error("resolve refs: cannot resolve reference '{reference}': {source}")]
    RefResolution {
        /// Reference as supplied by the caller.
        reference: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The two revisions share no history.
    #[error("baseline: no common ancestor between {from} and {to}")]
    NoCommonAncestor {
        /// Source commit.
        from: String,
        /// Target commit.
        to: String,
    },
    /// Ancestry or merge-base query failed.
    #[error("baseline: ancestry query failed for {from}..{to}: {source}")]
    Ancestry {
        /// Source commit.
        from: String,
        /// Target commit.
        to: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The repository could not be opened.
    #[error("repository at {path} is unavailable: {reason}")]
    BackendUnavailable {
        /// Path that failed to open.
        path: String,
        /// Why it could not be opened.
        reason: String,
    },
    /// Walking the commit log failed.
    #[error("history: failed to read commits {from}..{to}: {source}")]
    HistoryFetch {
        /// Baseline commit (exclusive).
        from: String,
        /// Target commit (inclusive).
        to: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// Any other backend failure, tagged with its stage.
    #[error("{stage}: {source}")]
    Backend {
        /// Stage that failed.
        stage: Stage,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The caller's cancellation token fired.
    #[error("{stage}: cancelled")]
    Cancelled {
        /// Stage the cancellation was observed in.
        stage: Stage,
    },
    /// Report serialization failed.
    #[error("failed to serialize report: {source}")]
    Serialize {
        /// Serializer error.
        #[from]
        source: serde_json::Error,
    },
    /// Writing output failed.
    #[error("i/o error: {source}")]
    Io {
        /// Original I/O error.
        #[from]
        source: std::io::Error,
    },
    /// Underlying git operation failed.
    #[error("git error: {source}")]
    Git {
        /// Original libgit2 error.
        #[from]
        source: git2::Error,
    },
}

impl Error {
    /// Wrap a backend failure for `stage`, keeping cancellation distinct.
    #[must_use]
    pub fn backend(stage: Stage, source: BackendError) -> Self {
        match source {
            BackendError::Cancelled => Self::Cancelled { stage },
            source => Self::Backend { stage, source },
        }
    }
}
