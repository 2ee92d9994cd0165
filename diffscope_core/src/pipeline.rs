//! Report pipeline: resolve refs, pick a baseline, diff, classify, filter,
//! aggregate and assemble.
//!
//! The file list always comes from a tree diff between the two endpoints.
//! The baseline only scopes the commit history shown next to it.

use chrono::Utc;
use diffscope_api::{
    ChangeKind, ChangeRecord, CommitEntry, CommitRange, DiffLinks, DiffReport, FileCounts,
    FilterRule, FilterStats, GeneratorInfo, HistoryOptions, HistoryView, Integrity, LineTotals,
    Metadata, ReportRequest, RepositoryInfo, RequestOptions, Resolution, ResolvedRef, Revision,
    Summary, TreeDiff, VersionDiffLink, SCHEMA_VERSION,
};
use diffscope_backend::{BackendError, Cancellation, LogOrder, RawChange, VcsBackend};
use tracing::{debug, info};

use crate::baseline::{resolve_baseline, BaselineResult};
use crate::classify::Classifier;
use crate::filter::ExclusionFilter;
use crate::links::ForgeLinks;
use crate::{Error, Result, Stage};

/// Name reported in `metadata.generator`.
pub const GENERATOR_NAME: &str = "diffscope";

/// Surviving changes of a tree diff plus the statistics of what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredChanges {
    /// Changes that passed the exclusion rules, in backend order.
    pub files: Vec<ChangeRecord>,
    /// Number of changes dropped by the rules.
    pub filtered_out: usize,
    /// Binary changes in the raw diff, excluded or not.
    pub binary_detected: usize,
}

/// Report generator bound to one backend handle.
#[derive(Debug)]
pub struct ReportPipeline<'a, B: VcsBackend + ?Sized> {
    backend: &'a B,
    classifier: Classifier,
    filter: ExclusionFilter,
}

impl<'a, B: VcsBackend + ?Sized> ReportPipeline<'a, B> {
    /// Pipeline with the default classification tables.
    #[must_use]
    pub fn new(backend: &'a B, rule: FilterRule) -> Self {
        Self {
            backend,
            classifier: Classifier::default(),
            filter: ExclusionFilter::new(rule),
        }
    }

    /// Replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Generate the report between `from_ref` and `to_ref`.
    ///
    /// # Errors
    ///
    /// Any backend failure aborts the whole call; see [`Error`] for the
    /// taxonomy. No partial report is ever returned.
    pub fn generate(
        &self,
        from_ref: &str,
        to_ref: &str,
        options: RequestOptions,
        cancel: &Cancellation,
    ) -> Result<DiffReport> {
        checkpoint(cancel, Stage::ResolveRefs)?;
        let from = self.resolve(from_ref, cancel)?;
        let to = self.resolve(to_ref, cancel)?;
        info!(from = %from.oid, to = %to.oid, "resolved references");

        let (baseline, changes, history) = if from.oid == to.oid {
            debug!("identical revisions, skipping diff and history");
            (
                BaselineResult::identity(&from),
                FilteredChanges::default(),
                Vec::new(),
            )
        } else {
            checkpoint(cancel, Stage::Baseline)?;
            let baseline = resolve_baseline(self.backend, &from, &to, cancel)?;
            info!(
                strategy = ?baseline.strategy,
                base = %baseline.base_commit.oid,
                "selected baseline"
            );

            checkpoint(cancel, Stage::TreeDiff)?;
            let raw = self
                .backend
                .diff_trees(&from.oid, &to.oid, cancel)
                .map_err(|source| Error::backend(Stage::TreeDiff, source))?;
            let changes = self.filter_changes(raw);
            info!(
                kept = changes.files.len(),
                filtered = changes.filtered_out,
                binary = changes.binary_detected,
                "classified tree diff"
            );

            checkpoint(cancel, Stage::History)?;
            let history = self.history(&baseline.base_commit.oid, &to.oid, options, cancel)?;
            info!(commits = history.len(), "collected history");

            (baseline, changes, history)
        };

        Ok(self.assemble(
            ReportRequest {
                from_ref: from_ref.to_owned(),
                to_ref: to_ref.to_owned(),
                options,
                filters: self.filter.rule().clone(),
            },
            Resolution {
                from: resolved(from_ref, &from),
                to: resolved(to_ref, &to),
            },
            &baseline,
            changes,
            history,
        ))
    }

    /// Classify every raw change and drop the excluded ones.
    #[must_use]
    pub fn filter_changes(&self, raw: Vec<RawChange>) -> FilteredChanges {
        let mut result = FilteredChanges::default();
        for change in raw {
            let path = change.path.effective();
            let classification = self
                .classifier
                .classify(path, change.kind, change.is_binary);
            if classification.is_binary {
                result.binary_detected += 1;
            }
            if self.filter.should_exclude(path) {
                debug!(path, "excluded by filter rules");
                result.filtered_out += 1;
                continue;
            }
            result.files.push(ChangeRecord::new(
                change.path,
                change.kind,
                change.lines,
                classification,
            ));
        }
        result
    }

    fn resolve(&self, reference: &str, cancel: &Cancellation) -> Result<Revision> {
        self.backend
            .resolve_ref(reference, cancel)
            .map_err(|source| match source {
                BackendError::RefNotFound { .. } => Error::RefResolution {
                    reference: reference.to_owned(),
                    source,
                },
                source => Error::backend(Stage::ResolveRefs, source),
            })
    }

    fn history(
        &self,
        base: &str,
        to: &str,
        options: RequestOptions,
        cancel: &Cancellation,
    ) -> Result<Vec<CommitEntry>> {
        let commits = self
            .backend
            .commit_log(base, to, LogOrder::NewestFirst, cancel)
            .map_err(|source| match source {
                BackendError::Cancelled => Error::Cancelled {
                    stage: Stage::History,
                },
                source => Error::HistoryFetch {
                    from: base.to_owned(),
                    to: to.to_owned(),
                    source,
                },
            })?;

        let links = ForgeLinks::new(&self.backend.remote_url());
        let mut commits: Vec<_> = commits
            .into_iter()
            .filter(|commit| !(options.ignore_merge_commits && commit.is_merge()))
            .collect();
        // Walk is newest first; equal timestamps keep the reversed walk order.
        commits.reverse();
        commits.sort_by_key(|commit| commit.timestamp);

        Ok(commits
            .into_iter()
            .map(|commit| CommitEntry {
                diff_url: links.commit_url(&commit.hash),
                hash: commit.hash,
                author: commit.author,
                date: commit.timestamp,
                message: commit.message,
            })
            .collect())
    }

    fn assemble(
        &self,
        request: ReportRequest,
        resolution: Resolution,
        baseline: &BaselineResult,
        changes: FilteredChanges,
        commits: Vec<CommitEntry>,
    ) -> DiffReport {
        let url = self.backend.remote_url();
        let links = ForgeLinks::new(&url);
        let base = baseline.base_commit.oid.clone();
        let target = resolution.to.commit.clone();
        let integrity = Integrity::for_history(commits.len());

        DiffReport {
            schema_version: SCHEMA_VERSION.to_owned(),
            repository: RepositoryInfo {
                name: self.backend.display_name(),
                url,
                vcs: "git".to_owned(),
            },
            filters: FilterStats {
                suffix_excluded: request.filters.exclude_suffixes.clone(),
                path_excluded: request.filters.exclude_paths.clone(),
                binary_files_detected: changes.binary_detected,
                files_filtered_out: changes.filtered_out,
            },
            tree_diff: TreeDiff {
                summary: aggregate(&changes.files),
                files: changes.files,
            },
            history_view: HistoryView {
                options: HistoryOptions {
                    merge_commits_included: !request.options.ignore_merge_commits,
                },
                commit_range: CommitRange {
                    from: base.clone(),
                    to: target.clone(),
                },
                commits,
            },
            diff_links: DiffLinks {
                version_diff: VersionDiffLink {
                    url: links.compare_url(&base, &target),
                    base,
                    target,
                },
            },
            integrity,
            metadata: Metadata {
                generated_at: Utc::now(),
                generator: GeneratorInfo {
                    name: GENERATOR_NAME.to_owned(),
                    version: env!("CARGO_PKG_VERSION").to_owned(),
                },
            },
            baseline: baseline.to_section(),
            resolution,
            request,
        }
    }
}

/// Generate a report with the default classifier.
///
/// # Errors
///
/// See [`ReportPipeline::generate`].
pub fn generate_report<B: VcsBackend + ?Sized>(
    backend: &B,
    from_ref: &str,
    to_ref: &str,
    options: RequestOptions,
    rule: FilterRule,
    cancel: &Cancellation,
) -> Result<DiffReport> {
    ReportPipeline::new(backend, rule).generate(from_ref, to_ref, options, cancel)
}

/// Per-kind counts and line totals over `files`.
#[must_use]
pub fn aggregate(files: &[ChangeRecord]) -> Summary {
    let mut counts = FileCounts::default();
    let mut added = 0_u64;
    let mut deleted = 0_u64;
    for file in files {
        match file.change_type {
            ChangeKind::Added => counts.added += 1,
            ChangeKind::Modified => counts.modified += 1,
            ChangeKind::Deleted => counts.deleted += 1,
            ChangeKind::Renamed => counts.renamed += 1,
        }
        added = added.saturating_add(file.lines.added);
        deleted = deleted.saturating_add(file.lines.deleted);
    }
    Summary {
        files: counts,
        lines: LineTotals {
            added,
            deleted,
            net: signed(added).saturating_sub(signed(deleted)),
        },
    }
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn resolved(reference: &str, revision: &Revision) -> ResolvedRef {
    ResolvedRef {
        reference: reference.to_owned(),
        kind: revision.kind,
        commit: revision.oid.clone(),
    }
}

fn checkpoint(cancel: &Cancellation, stage: Stage) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled { stage });
    }
    Ok(())
}
