//! Version control backend interface consumed by the diffscope pipeline.
//!
//! The pipeline only ever talks to a repository through [`VcsBackend`]: ref
//! resolution, ancestry queries, tree diffs and the commit log. Every call
//! that touches the object store takes a [`Cancellation`] token.

mod cancel;
mod memory;
mod types;

pub use cancel::Cancellation;
pub use memory::{BackendOp, MemoryBackend};
pub use types::{BackendError, BackendResult, LogOrder, RawChange, RawCommit};

use diffscope_api::Revision;

/// Read-only capability set the report pipeline needs from a repository.
///
/// Handles are opened per report and never shared between concurrent
/// report generations.
pub trait VcsBackend {
    /// Resolve a human-supplied reference to a commit.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::RefNotFound`] for unknown or ambiguous references.
    fn resolve_ref(&self, reference: &str, cancel: &Cancellation) -> BackendResult<Revision>;

    /// Whether `ancestor` is reachable from `descendant`. A commit counts as
    /// its own ancestor.
    ///
    /// # Errors
    ///
    /// Returns an error when either commit cannot be read.
    fn is_ancestor(
        &self,
        ancestor: &str,
        descendant: &str,
        cancel: &Cancellation,
    ) -> BackendResult<bool>;

    /// All best common ancestors of `a` and `b`, in backend order.
    ///
    /// # Errors
    ///
    /// Returns an error when either commit cannot be read. Disjoint histories
    /// are reported as an empty list, not an error.
    fn merge_bases(&self, a: &str, b: &str, cancel: &Cancellation) -> BackendResult<Vec<String>>;

    /// Tree diff between two commits, with binary probe and line counts per path.
    ///
    /// # Errors
    ///
    /// Returns an error when either tree or any blob cannot be read.
    fn diff_trees(&self, from: &str, to: &str, cancel: &Cancellation)
        -> BackendResult<Vec<RawChange>>;

    /// Commits reachable from `to_inclusive` but not from `from_exclusive`.
    ///
    /// # Errors
    ///
    /// Returns an error when the walk cannot be set up or a commit cannot be read.
    fn commit_log(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
        order: LogOrder,
        cancel: &Cancellation,
    ) -> BackendResult<Vec<RawCommit>>;

    /// Normalized remote URL, or an empty string without a remote.
    fn remote_url(&self) -> String;

    /// Human-friendly repository name.
    fn display_name(&self) -> String;
}
