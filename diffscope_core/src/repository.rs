//! Repository access built on top of libgit2.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use diffscope_api::{ChangeKind, ChangePath, LineStats, RefKind, Revision};
use diffscope_backend::{
    BackendError, BackendResult, Cancellation, LogOrder, RawChange, RawCommit, VcsBackend,
};
use git2::{
    BranchType, Delta, DiffFile, DiffOptions, ErrorCode, Oid, Patch, Repository as GitRepository,
    Sort,
};
use tracing::debug;

use crate::links::{normalize_remote_url, repository_name};
use crate::{Error, Result};

/// Read-only handle to a git repository, opened once per report.
pub struct GitBackend {
    inner: GitRepository,
    root: PathBuf,
}

impl GitBackend {
    /// Open the repository containing `path`.
    ///
    /// Bare repositories are accepted; the report never touches a worktree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] when the path does not exist or
    /// is not inside a readable repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical =
            std::fs::canonicalize(original).map_err(|source| Error::BackendUnavailable {
                path: display_path(original),
                reason: source.to_string(),
            })?;

        let inner =
            GitRepository::discover(&canonical).map_err(|err| Error::BackendUnavailable {
                path: display_path(&canonical),
                reason: err.message().to_owned(),
            })?;

        let root = inner
            .workdir()
            .unwrap_or_else(|| inner.path())
            .to_path_buf();
        debug!(root = %root.display(), bare = inner.is_bare(), "opened repository");

        Ok(Self { inner, root })
    }

    /// Returns the absolute path to the repository root (the git dir when bare).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_kind(&self, reference: &str) -> RefKind {
        let repo = &self.inner;
        if reference.starts_with("refs/tags/")
            || repo
                .find_reference(&format!("refs/tags/{reference}"))
                .is_ok()
        {
            RefKind::Tag
        } else if reference.starts_with("refs/heads/")
            || reference.starts_with("refs/remotes/")
            || repo.find_branch(reference, BranchType::Local).is_ok()
            || repo.find_branch(reference, BranchType::Remote).is_ok()
        {
            RefKind::Branch
        } else {
            RefKind::Commit
        }
    }

    fn find_commit(&self, oid: &str) -> BackendResult<git2::Commit<'_>> {
        let not_found = || BackendError::ObjectNotFound {
            oid: oid.to_owned(),
        };
        let id = Oid::from_str(oid).map_err(|_| not_found())?;
        self.inner.find_commit(id).map_err(|err| match err.code() {
            ErrorCode::NotFound => not_found(),
            _ => backend_error(err),
        })
    }
}

impl VcsBackend for GitBackend {
    fn resolve_ref(&self, reference: &str, cancel: &Cancellation) -> BackendResult<Revision> {
        cancel.check()?;
        let not_found = || BackendError::RefNotFound {
            reference: reference.to_owned(),
        };
        let commit = self
            .inner
            .revparse_single(reference)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| not_found())?;
        let kind = self.ref_kind(reference);
        debug!(reference, oid = %commit.id(), %kind, "resolved reference");
        Ok(Revision::new(commit.id().to_string(), kind))
    }

    fn is_ancestor(
        &self,
        ancestor: &str,
        descendant: &str,
        cancel: &Cancellation,
    ) -> BackendResult<bool> {
        cancel.check()?;
        let ancestor = self.find_commit(ancestor)?.id();
        let descendant = self.find_commit(descendant)?.id();
        if ancestor == descendant {
            return Ok(true);
        }
        self.inner
            .graph_descendant_of(descendant, ancestor)
            .map_err(backend_error)
    }

    fn merge_bases(&self, a: &str, b: &str, cancel: &Cancellation) -> BackendResult<Vec<String>> {
        cancel.check()?;
        let a = self.find_commit(a)?.id();
        let b = self.find_commit(b)?.id();
        match self.inner.merge_bases(a, b) {
            Ok(oids) => Ok(oids.iter().map(ToString::to_string).collect()),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(Vec::new()),
            Err(err) => Err(backend_error(err)),
        }
    }

    fn diff_trees(
        &self,
        from: &str,
        to: &str,
        cancel: &Cancellation,
    ) -> BackendResult<Vec<RawChange>> {
        cancel.check()?;
        let old_tree = self
            .find_commit(from)?
            .tree()
            .map_err(backend_error)?;
        let new_tree = self
            .find_commit(to)?
            .tree()
            .map_err(backend_error)?;

        let mut options = DiffOptions::new();
        let diff = self
            .inner
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut options))
            .map_err(backend_error)?;

        let mut changes = Vec::with_capacity(diff.deltas().len());
        for (index, delta) in diff.deltas().enumerate() {
            cancel.check()?;
            let kind = match delta.status() {
                Delta::Added | Delta::Copied => ChangeKind::Added,
                Delta::Deleted => ChangeKind::Deleted,
                Delta::Renamed => ChangeKind::Renamed,
                Delta::Modified | Delta::Typechange => ChangeKind::Modified,
                _ => continue,
            };
            let before = if kind == ChangeKind::Added {
                String::new()
            } else {
                file_path(&delta.old_file())
            };
            let after = if kind == ChangeKind::Deleted {
                String::new()
            } else {
                file_path(&delta.new_file())
            };

            let patch = Patch::from_diff(&diff, index).map_err(backend_error)?;
            let (lines, is_binary) = match patch {
                Some(patch) if !patch.delta().flags().is_binary() => {
                    let (_, added, deleted) =
                        patch.line_stats().map_err(backend_error)?;
                    (LineStats::new(count(added), count(deleted)), false)
                }
                _ => (LineStats::ZERO, true),
            };

            changes.push(RawChange {
                path: ChangePath::new(before, after),
                kind,
                lines,
                is_binary,
            });
        }
        debug!(from, to, changes = changes.len(), "computed tree diff");
        Ok(changes)
    }

    fn commit_log(
        &self,
        from_exclusive: &str,
        to_inclusive: &str,
        order: LogOrder,
        cancel: &Cancellation,
    ) -> BackendResult<Vec<RawCommit>> {
        cancel.check()?;
        let hidden = self.find_commit(from_exclusive)?.id();
        let tip = self.find_commit(to_inclusive)?.id();

        let mut walk = self.inner.revwalk().map_err(backend_error)?;
        let sorting = match order {
            LogOrder::NewestFirst => Sort::TIME,
            LogOrder::OldestFirst => Sort::TIME | Sort::REVERSE,
        };
        walk.set_sorting(sorting).map_err(backend_error)?;
        walk.push(tip).map_err(backend_error)?;
        walk.hide(hidden).map_err(backend_error)?;

        let mut commits = Vec::new();
        for oid in walk {
            cancel.check()?;
            let oid = oid.map_err(backend_error)?;
            let commit = self
                .inner
                .find_commit(oid)
                .map_err(backend_error)?;
            let author = commit.author();
            commits.push(RawCommit {
                hash: oid.to_string(),
                author: author.name().unwrap_or_default().to_owned(),
                timestamp: DateTime::<Utc>::from_timestamp(author.when().seconds(), 0)
                    .unwrap_or_default(),
                message: commit.message().unwrap_or_default().to_owned(),
                parent_count: commit.parent_count(),
            });
        }
        Ok(commits)
    }

    fn remote_url(&self) -> String {
        self.inner
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(normalize_remote_url))
            .unwrap_or_default()
    }

    fn display_name(&self) -> String {
        repository_name(&self.remote_url())
    }
}

fn backend_error(err: git2::Error) -> BackendError {
    BackendError::message(err.message())
}

fn file_path(file: &DiffFile<'_>) -> String {
    file.path()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn count(lines: usize) -> u64 {
    u64::try_from(lines).unwrap_or(u64::MAX)
}

fn display_path(path: &Path) -> String {
    path.to_path_buf()
        .into_os_string()
        .to_string_lossy()
        .into_owned()
}

impl fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitBackend")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexEntry, IndexTime, Signature, Time};
    use tempfile::TempDir;

    const TEXT: &str = "one\ntwo\nthree\n";

    #[test]
    fn open_non_repository_is_unavailable() {
        let temp = TempDir::new().expect("tempdir");
        let err = GitBackend::open(temp.path());
        assert!(matches!(err, Err(Error::BackendUnavailable { .. })));
    }

    #[test]
    fn open_missing_path_is_unavailable() {
        let temp = TempDir::new().expect("tempdir");
        let err = GitBackend::open(temp.path().join("missing"));
        assert!(matches!(err, Err(Error::BackendUnavailable { .. })));
    }

    #[test]
    fn resolves_reference_kinds() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let first = commit(&repo, &[("a.txt", TEXT)], &[], 100, "first")?;
        repo.reference("refs/heads/main", first, true, "test")?;
        repo.reference("refs/tags/v1.0.0", first, true, "test")?;

        let backend = GitBackend::open(temp.path())?;
        let cancel = Cancellation::new();
        let tag = backend.resolve_ref("v1.0.0", &cancel).expect("tag");
        let branch = backend.resolve_ref("main", &cancel).expect("branch");
        let short = backend
            .resolve_ref(&first.to_string()[..10], &cancel)
            .expect("short hash");

        assert_eq!(tag.kind, RefKind::Tag);
        assert_eq!(branch.kind, RefKind::Branch);
        assert_eq!(short.kind, RefKind::Commit);
        assert_eq!(short.oid, first.to_string());
        assert!(matches!(
            backend.resolve_ref("nope", &cancel),
            Err(BackendError::RefNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn ancestry_and_merge_bases() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let root = commit(&repo, &[("a.txt", TEXT)], &[], 100, "root")?;
        let left = commit(&repo, &[("a.txt", "left\n")], &[root], 200, "left")?;
        let right = commit(&repo, &[("a.txt", "right\n")], &[root], 300, "right")?;

        let backend = GitBackend::open(temp.path())?;
        let cancel = Cancellation::new();
        let (root, left, right) = (root.to_string(), left.to_string(), right.to_string());

        assert!(backend.is_ancestor(&root, &left, &cancel).expect("ancestry"));
        assert!(backend.is_ancestor(&left, &left, &cancel).expect("ancestry"));
        assert!(!backend.is_ancestor(&left, &right, &cancel).expect("ancestry"));
        assert!(!backend.is_ancestor(&left, &root, &cancel).expect("ancestry"));
        assert_eq!(
            backend.merge_bases(&left, &right, &cancel).expect("bases"),
            vec![root]
        );
        Ok(())
    }

    #[test]
    fn disjoint_roots_have_no_merge_base() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let one = commit(&repo, &[("a.txt", TEXT)], &[], 100, "one")?;
        let two = commit(&repo, &[("b.txt", TEXT)], &[], 200, "two")?;

        let backend = GitBackend::open(temp.path())?;
        let bases = backend
            .merge_bases(&one.to_string(), &two.to_string(), &Cancellation::new())
            .expect("bases");
        assert!(bases.is_empty());
        Ok(())
    }

    #[test]
    fn tree_diff_reports_kinds_lines_and_binary() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let before = commit(
            &repo,
            &[("keep.txt", TEXT), ("gone.txt", "bye\n")],
            &[],
            100,
            "before",
        )?;
        let after = commit(
            &repo,
            &[
                ("keep.txt", "one\n2\nthree\nfour\n"),
                ("new.txt", "hello\n"),
                ("blob.bin", "\x00\x01\x02\x00"),
            ],
            &[before],
            200,
            "after",
        )?;

        let backend = GitBackend::open(temp.path())?;
        let changes = backend
            .diff_trees(&before.to_string(), &after.to_string(), &Cancellation::new())
            .expect("diff");

        let find = |path: &str| {
            changes
                .iter()
                .find(|c| c.path.effective() == path)
                .expect("change present")
        };
        let keep = find("keep.txt");
        assert_eq!(keep.kind, ChangeKind::Modified);
        assert_eq!(keep.lines, LineStats::new(2, 1));
        assert!(!keep.is_binary);

        let gone = find("gone.txt");
        assert_eq!(gone.kind, ChangeKind::Deleted);
        assert!(gone.path.after.is_empty());
        assert_eq!(gone.lines.deleted, 1);

        assert_eq!(find("new.txt").kind, ChangeKind::Added);
        assert!(find("new.txt").path.before.is_empty());
        assert!(find("blob.bin").is_binary);
        assert_eq!(changes.len(), 4);
        Ok(())
    }

    #[test]
    fn commit_log_hides_base_and_orders_by_time() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let first = commit(&repo, &[("a.txt", "1\n")], &[], 100, "first")?;
        let second = commit(&repo, &[("a.txt", "2\n")], &[first], 200, "second")?;
        let third = commit(&repo, &[("a.txt", "3\n")], &[second], 300, "third")?;

        let backend = GitBackend::open(temp.path())?;
        let cancel = Cancellation::new();
        let log = |order| {
            backend
                .commit_log(&first.to_string(), &third.to_string(), order, &cancel)
                .expect("log")
                .into_iter()
                .map(|c| c.message)
                .collect::<Vec<_>>()
        };

        assert_eq!(log(LogOrder::NewestFirst), ["third", "second"]);
        assert_eq!(log(LogOrder::OldestFirst), ["second", "third"]);
        Ok(())
    }

    #[test]
    fn remote_url_is_normalized() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        repo.remote("origin", "git@github.com:acme/widget.git")?;

        let backend = GitBackend::open(temp.path())?;
        assert_eq!(backend.remote_url(), "https://github.com/acme/widget");
        assert_eq!(backend.display_name(), "widget");
        Ok(())
    }

    #[test]
    fn missing_origin_is_unknown() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        GitRepository::init(temp.path())?;

        let backend = GitBackend::open(temp.path())?;
        assert!(backend.remote_url().is_empty());
        assert_eq!(backend.display_name(), "unknown");
        Ok(())
    }

    #[test]
    fn fired_token_fails_calls() -> Result<()> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        let only = commit(&repo, &[("a.txt", TEXT)], &[], 100, "only")?;

        let backend = GitBackend::open(temp.path())?;
        let cancel = Cancellation::new();
        cancel.cancel();
        assert!(matches!(
            backend.diff_trees(&only.to_string(), &only.to_string(), &cancel),
            Err(BackendError::Cancelled)
        ));
        Ok(())
    }

    /// Commit a flat set of files with a fixed author time, without touching
    /// HEAD or the worktree.
    fn commit(
        repo: &GitRepository,
        files: &[(&str, &str)],
        parents: &[Oid],
        seconds: i64,
        message: &str,
    ) -> Result<Oid> {
        let mut index = git2::Index::new()?;
        for (path, contents) in files {
            index.add(&IndexEntry {
                ctime: IndexTime::new(0, 0),
                mtime: IndexTime::new(0, 0),
                dev: 0,
                ino: 0,
                mode: 0o100_644,
                uid: 0,
                gid: 0,
                file_size: 0,
                id: repo.blob(contents.as_bytes())?,
                flags: 0,
                flags_extended: 0,
                path: path.as_bytes().to_vec(),
            })?;
        }
        let tree = repo.find_tree(index.write_tree_to(repo)?)?;
        let signature = Signature::new("Test User", "test@example.com", &Time::new(seconds, 0))?;
        let parents = parents
            .iter()
            .map(|oid| repo.find_commit(*oid))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        Ok(repo.commit(None, &signature, &signature, message, &tree, &parent_refs)?)
    }
}
