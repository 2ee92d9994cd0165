use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::change::{ChangeRecord, FilterRule, Summary};
use super::revision::RefKind;

/// Version of the JSON contract emitted for [`DiffReport`].
pub const SCHEMA_VERSION: &str = "1.0";

/// Note attached to the integrity block when the history view is empty.
pub const EMPTY_HISTORY_NOTE: &str =
    "No commits in range (identical base and target, or all merge commits filtered)";

/// Top-level change report between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Contract version, see [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Identity of the repository the report was computed in.
    pub repository: RepositoryInfo,
    /// The request as supplied by the caller.
    pub request: ReportRequest,
    /// How both references resolved.
    pub resolution: Resolution,
    /// Baseline used to scope the history view.
    pub baseline: Baseline,
    /// Exclusion rules and their effect.
    pub filters: FilterStats,
    /// Surviving file changes and their summary.
    pub tree_diff: TreeDiff,
    /// Commits between the baseline and the target.
    pub history_view: HistoryView,
    /// Cross-links to the forge.
    pub diff_links: DiffLinks,
    /// How the tree diff and history view relate.
    pub integrity: Integrity,
    /// Generation metadata.
    pub metadata: Metadata,
}

/// Repository identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Display name, usually the last segment of the remote URL.
    pub name: String,
    /// Normalized remote URL; empty when the repository has no `origin`.
    #[serde(default)]
    pub url: String,
    /// Version control system, always `git` today.
    pub vcs: String,
}

/// Options that shape a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Drop commits with more than one parent from the history view.
    #[serde(default)]
    pub ignore_merge_commits: bool,
    /// Echoed only; similarity detection is never performed.
    #[serde(default)]
    pub detect_renames: bool,
}

/// The echoed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Reference the report starts from.
    pub from_ref: String,
    /// Reference the report ends at.
    pub to_ref: String,
    /// Options in effect.
    pub options: RequestOptions,
    /// Exclusion rules in effect.
    pub filters: FilterRule,
}

/// Resolution of both references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolution of `from_ref`.
    pub from: ResolvedRef,
    /// Resolution of `to_ref`.
    pub to: ResolvedRef,
}

/// One reference and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRef {
    /// Reference as supplied.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Kind of the reference.
    #[serde(rename = "type")]
    pub kind: RefKind,
    /// Full commit hash.
    pub commit: String,
}

/// How the baseline commit was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineStrategy {
    /// `from` is an ancestor of `to` and is used as-is.
    Direct,
    /// The first merge-base candidate of `from` and `to`.
    MergeBase,
}

/// Shape of the history between the two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// `from` is a direct ancestor of `to`.
    Linear,
    /// The histories diverged after the baseline.
    Branched,
}

impl Relationship {
    /// Relationship implied by a linearity flag.
    pub const fn from_linear(is_linear: bool) -> Self {
        if is_linear {
            Self::Linear
        } else {
            Self::Branched
        }
    }
}

/// Baseline section of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// Strategy that produced the base commit.
    pub strategy: BaselineStrategy,
    /// Full hash of the base commit.
    pub base_commit: String,
    /// Ancestry details.
    pub ancestry: Ancestry,
}

/// Ancestry details between the two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
    /// True iff `from` is an ancestor of `to`.
    pub is_linear: bool,
    /// Derived from `is_linear`.
    pub relationship: Relationship,
}

/// Exclusion rules and statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Suffix rules in effect.
    #[serde(default)]
    pub suffix_excluded: Vec<String>,
    /// Path-prefix rules in effect.
    #[serde(default)]
    pub path_excluded: Vec<String>,
    /// Binary changes seen in the raw tree diff, excluded or not.
    pub binary_files_detected: usize,
    /// Changes dropped by the exclusion rules.
    pub files_filtered_out: usize,
}

/// Tree-diff section: the surviving changes and their summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    /// Summary over `files`.
    pub summary: Summary,
    /// Changes that passed the exclusion rules.
    #[serde(default)]
    pub files: Vec<ChangeRecord>,
}

/// A commit shown in the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Full commit hash.
    pub hash: String,
    /// Author display name.
    pub author: String,
    /// Author timestamp in UTC.
    pub date: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
    /// Link to the commit on the forge; empty without a remote.
    #[serde(default)]
    pub diff_url: String,
}

/// History view options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    /// False when merge commits were dropped.
    pub merge_commits_included: bool,
}

/// Commit range of the history view (`from` exclusive, `to` inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRange {
    /// Baseline commit.
    pub from: String,
    /// Target commit.
    pub to: String,
}

/// Commit history between baseline and target, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    /// Options in effect.
    pub options: HistoryOptions,
    /// Range that was walked.
    pub commit_range: CommitRange,
    /// Commits in ascending timestamp order.
    #[serde(default)]
    pub commits: Vec<CommitEntry>,
}

/// Forge cross-links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLinks {
    /// Compare page between the baseline and the target.
    pub version_diff: VersionDiffLink,
}

/// A compare link between two commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiffLink {
    /// Base commit hash.
    pub base: String,
    /// Target commit hash.
    pub target: String,
    /// Compare URL; empty without a remote.
    #[serde(default)]
    pub url: String,
}

/// What the file list was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffBasis {
    /// Direct tree diff between the `from` and `to` endpoints.
    TreeDiff,
}

/// What the history view may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    /// Context only; the file diff must not be inferred from it.
    ExplanatoryOnly,
}

/// Relationship between the tree diff and the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrity {
    /// Always [`DiffBasis::TreeDiff`].
    pub diff_basis: DiffBasis,
    /// Always [`HistoryRole::ExplanatoryOnly`].
    pub history_role: HistoryRole,
    /// Excluded files never reach the summary.
    pub filtered_files_not_counted_in_stats: bool,
    /// [`EMPTY_HISTORY_NOTE`] when there are no commits, else empty.
    #[serde(default)]
    pub history_note: String,
}

impl Integrity {
    /// Integrity block for a history view with `commit_count` entries.
    pub fn for_history(commit_count: usize) -> Self {
        Self {
            diff_basis: DiffBasis::TreeDiff,
            history_role: HistoryRole::ExplanatoryOnly,
            filtered_files_not_counted_in_stats: true,
            history_note: if commit_count == 0 {
                EMPTY_HISTORY_NOTE.to_owned()
            } else {
                String::new()
            },
        }
    }
}

/// Generation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// When the report was assembled (UTC).
    pub generated_at: DateTime<Utc>,
    /// Which tool produced it.
    pub generator: GeneratorInfo,
}

/// Generator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: String,
}
