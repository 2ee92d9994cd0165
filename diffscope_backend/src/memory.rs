use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use diffscope_api::{RefKind, Revision};

use crate::{BackendError, BackendResult, Cancellation, LogOrder, RawChange, RawCommit, VcsBackend};

/// Backend operations, used to record calls and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    /// [`VcsBackend::resolve_ref`]
    ResolveRef,
    /// [`VcsBackend::is_ancestor`]
    IsAncestor,
    /// [`VcsBackend::merge_bases`]
    MergeBases,
    /// [`VcsBackend::diff_trees`]
    DiffTrees,
    /// [`VcsBackend::commit_log`]
    CommitLog,
}

#[derive(Debug)]
struct MemoryCommit {
    parents: Vec<String>,
    author: String,
    timestamp: DateTime<Utc>,
    message: String,
}

/// In-memory commit graph implementing [`VcsBackend`] without a repository.
///
/// Tree diffs are not computed; they are registered per `(from, to)` pair
/// with [`MemoryBackend::changes`]. Merge bases are derived from the graph
/// (newest registered candidate first) unless overridden.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    commits: HashMap<String, MemoryCommit>,
    order: Vec<String>,
    refs: HashMap<String, Revision>,
    changes: HashMap<(String, String), Vec<RawChange>>,
    merge_base_overrides: HashMap<(String, String), Vec<String>>,
    failures: HashMap<BackendOp, String>,
    remote_url: String,
    name: String,
    calls: Mutex<Vec<BackendOp>>,
}

impl MemoryBackend {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commit. Parents should be registered first.
    pub fn commit(
        &mut self,
        oid: &str,
        parents: &[&str],
        author: &str,
        timestamp: i64,
        message: &str,
    ) -> &mut Self {
        let commit = MemoryCommit {
            parents: parents.iter().map(|p| (*p).to_owned()).collect(),
            author: author.to_owned(),
            timestamp: DateTime::from_timestamp(timestamp, 0).unwrap_or_default(),
            message: message.to_owned(),
        };
        if self.commits.insert(oid.to_owned(), commit).is_none() {
            self.order.push(oid.to_owned());
        }
        self
    }

    /// Point a branch name at a commit.
    pub fn branch(&mut self, name: &str, oid: &str) -> &mut Self {
        self.refs
            .insert(name.to_owned(), Revision::new(oid, RefKind::Branch));
        self
    }

    /// Point a tag name at a commit.
    pub fn tag(&mut self, name: &str, oid: &str) -> &mut Self {
        self.refs
            .insert(name.to_owned(), Revision::new(oid, RefKind::Tag));
        self
    }

    /// Register the tree diff returned for `(from, to)`.
    pub fn changes(&mut self, from: &str, to: &str, changes: Vec<RawChange>) -> &mut Self {
        self.changes
            .insert((from.to_owned(), to.to_owned()), changes);
        self
    }

    /// Force the merge-base candidates reported for `a` and `b`, in order.
    pub fn merge_bases_for(&mut self, a: &str, b: &str, candidates: &[&str]) -> &mut Self {
        let candidates: Vec<String> = candidates.iter().map(|c| (*c).to_owned()).collect();
        self.merge_base_overrides
            .insert((a.to_owned(), b.to_owned()), candidates.clone());
        self.merge_base_overrides
            .insert((b.to_owned(), a.to_owned()), candidates);
        self
    }

    /// Make every call of `op` fail with `message`.
    pub fn fail(&mut self, op: BackendOp, message: &str) -> &mut Self {
        self.failures.insert(op, message.to_owned());
        self
    }

    /// Set the remote URL reported by [`VcsBackend::remote_url`].
    pub fn remote(&mut self, url: &str) -> &mut Self {
        url.clone_into(&mut self.remote_url);
        self
    }

    /// Set the name reported by [`VcsBackend::display_name`].
    pub fn name(&mut self, name: &str) -> &mut Self {
        name.clone_into(&mut self.name);
        self
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<BackendOp> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn enter(&self, op: BackendOp, cancel: &Cancellation) -> BackendResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
        cancel.check()?;
        match self.failures.get(&op) {
            Some(message) => Err(BackendError::message(message.clone())),
            None => Ok(()),
        }
    }

    fn require(&self, oid: &str) -> BackendResult<&MemoryCommit> {
        self.commits
            .get(oid)
            .ok_or_else(|| BackendError::ObjectNotFound {
                oid: oid.to_owned(),
            })
    }

    fn ancestors(&self, oid: &str) -> BackendResult<HashSet<String>> {
        self.require(oid)?;
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([oid.to_owned()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&current) {
                queue.extend(commit.parents.iter().cloned());
            }
        }
        Ok(seen)
    }

    fn position(&self, oid: &str) -> usize {
        self.order.iter().position(|o| o == oid).unwrap_or(0)
    }
}

impl VcsBackend for MemoryBackend {
    fn resolve_ref(&self, reference: &str, cancel: &Cancellation) -> BackendResult<Revision> {
        self.enter(BackendOp::ResolveRef, cancel)?;
        if let Some(revision) = self.refs.get(reference) {
            return Ok(revision.clone());
        }
        if self.commits.contains_key(reference) {
            return Ok(Revision::commit(reference));
        }

        let matches: Vec<&String> = if reference.len() >= 4 {
            self.order
                .iter()
                .filter(|oid| oid.starts_with(reference))
                .collect()
        } else {
            Vec::new()
        };
        match matches.as_slice() {
            [oid] => Ok(Revision::commit(oid.as_str())),
            _ => Err(BackendError::RefNotFound {
                reference: reference.to_owned(),
            }),
        }
    }

    fn is_ancestor(
        &self,
        ancestor: &str,
        descendant: &str,
        cancel: &Cancellation,
    ) -> BackendResult<bool> {
        self.enter(BackendOp::IsAncestor, cancel)?;
        self.require(ancestor)?;
        Ok(self.ancestors(descendant)?.contains(ancestor))
    }

    fn merge_bases(&self, a: &str, b: &str, cancel: &Cancellation) -> BackendResult<Vec<String>> {
        self.enter(BackendOp::MergeBases, cancel)?;
        let left = self.ancestors(a)?;
        let right = self.ancestors(b)?;
        if let Some(candidates) = self
            .merge_base_overrides
            .get(&(a.to_owned(), b.to_owned()))
        {
            return Ok(candidates.clone());
        }

        let common: HashSet<&String> = left.intersection(&right).collect();
        let mut best = Vec::new();
        for candidate in &common {
            let dominated = common.iter().any(|other| {
                other != candidate
                    && self
                        .ancestors(other)
                        .is_ok_and(|set| set.contains(candidate.as_str()))
            });
            if !dominated {
                best.push((*candidate).clone());
            }
        }
        best.sort_by_key(|oid| std::cmp::Reverse(self.position(oid)));
        Ok(best)
    }

    fn diff_trees(
        &self,
        from: &str,
        to: &str,
        cancel: &Cancellation,
    ) -> BackendResult<Vec<RawChange>> {
        self.enter(BackendOp::DiffTrees, cancel)?;
        self.require(from)?;
        self.require(to)?;
        Ok(self
            .changes
            .get(&(from.to_owned(), to.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    fn commit_log(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
        order: LogOrder,
        cancel: &Cancellation,
    ) -> BackendResult<Vec<RawCommit>> {
        self.enter(BackendOp::CommitLog, cancel)?;
        let hidden = self.ancestors(from_exclusive)?;
        let reachable = self.ancestors(to_inclusive)?;

        let mut commits: Vec<(usize, RawCommit)> = reachable
            .difference(&hidden)
            .filter_map(|oid| {
                self.commits.get(oid).map(|commit| {
                    (
                        self.position(oid),
                        RawCommit {
                            hash: oid.clone(),
                            author: commit.author.clone(),
                            timestamp: commit.timestamp,
                            message: commit.message.clone(),
                            parent_count: commit.parents.len(),
                        },
                    )
                })
            })
            .collect();

        commits.sort_by_key(|(position, commit)| (commit.timestamp, *position));
        if order == LogOrder::NewestFirst {
            commits.reverse();
        }
        Ok(commits.into_iter().map(|(_, commit)| commit).collect())
    }

    fn remote_url(&self) -> String {
        self.remote_url.clone()
    }

    fn display_name(&self) -> String {
        if self.name.is_empty() {
            "unknown".to_owned()
        } else {
            self.name.clone()
        }
    }
}
