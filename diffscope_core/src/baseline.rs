//! Baseline selection between two resolved revisions.
//!
//! Ancestry is only checked in the `from -> to` direction. When `from` is
//! not an ancestor of `to`, the first merge-base candidate the backend
//! returns is used. With criss-cross histories there can be several
//! candidates and the choice then depends on backend order.

use diffscope_api::{Ancestry, Baseline, BaselineStrategy, Relationship, Revision};
use diffscope_backend::{BackendError, Cancellation, VcsBackend};

use crate::{Error, Result, Stage};

/// Outcome of baseline selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineResult {
    /// Commit the history view starts after.
    pub base_commit: Revision,
    /// How `base_commit` was chosen.
    pub strategy: BaselineStrategy,
    /// True iff `from` is an ancestor of `to`.
    pub is_linear: bool,
}

impl BaselineResult {
    /// Baseline of a revision compared with itself.
    #[must_use]
    pub fn identity(revision: &Revision) -> Self {
        Self {
            base_commit: revision.clone(),
            strategy: BaselineStrategy::Direct,
            is_linear: true,
        }
    }

    /// Report section for this baseline.
    #[must_use]
    pub fn to_section(&self) -> Baseline {
        Baseline {
            strategy: self.strategy,
            base_commit: self.base_commit.oid.clone(),
            ancestry: Ancestry {
                is_linear: self.is_linear,
                relationship: Relationship::from_linear(self.is_linear),
            },
        }
    }
}

/// Choose the baseline between `from` and `to`.
///
/// # Errors
///
/// Returns [`Error::Ancestry`] when either revision cannot be read,
/// [`Error::NoCommonAncestor`] for disjoint histories and
/// [`Error::Cancelled`] once `cancel` fires.
pub fn resolve_baseline<B>(
    backend: &B,
    from: &Revision,
    to: &Revision,
    cancel: &Cancellation,
) -> Result<BaselineResult>
where
    B: VcsBackend + ?Sized,
{
    let ancestry_error = |source: BackendError| match source {
        BackendError::Cancelled => Error::Cancelled {
            stage: Stage::Baseline,
        },
        source => Error::Ancestry {
            from: from.oid.clone(),
            to: to.oid.clone(),
            source,
        },
    };

    if backend
        .is_ancestor(&from.oid, &to.oid, cancel)
        .map_err(ancestry_error)?
    {
        tracing::debug!(from = %from.oid, to = %to.oid, "from is an ancestor of to");
        return Ok(BaselineResult {
            base_commit: from.clone(),
            strategy: BaselineStrategy::Direct,
            is_linear: true,
        });
    }

    let candidates = backend
        .merge_bases(&from.oid, &to.oid, cancel)
        .map_err(ancestry_error)?;
    if candidates.len() > 1 {
        tracing::warn!(
            candidates = candidates.len(),
            chosen = %candidates[0],
            "multiple merge bases, using the first one reported"
        );
    }

    let base = candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoCommonAncestor {
            from: from.oid.clone(),
            to: to.oid.clone(),
        })?;

    Ok(BaselineResult {
        base_commit: Revision::commit(base),
        strategy: BaselineStrategy::MergeBase,
        is_linear: false,
    })
}
