use serde::{Deserialize, Serialize};

/// How a single path moved between the two compared trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Path only exists in the target tree.
    Added,
    /// Path exists in both trees with different content or mode.
    Modified,
    /// Path only exists in the source tree.
    Deleted,
    /// Path changed name between the trees.
    Renamed,
}

/// Before/after paths of a change. Empty strings mark the missing side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePath {
    /// Path in the source tree; empty when the file was added.
    #[serde(default)]
    pub before: String,
    /// Path in the target tree; empty when the file was deleted.
    #[serde(default)]
    pub after: String,
}

impl ChangePath {
    /// Construct a path pair.
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }

    /// The path exclusion and classification look at: the after-path, or the
    /// before-path for deletions.
    pub fn effective(&self) -> &str {
        if self.after.is_empty() {
            &self.before
        } else {
            &self.after
        }
    }
}

/// Line counts for one file. Always zero for binary files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    /// Number of added lines.
    pub added: u64,
    /// Number of deleted lines.
    pub deleted: u64,
}

impl LineStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        added: 0,
        deleted: 0,
    };

    /// Convenience constructor for explicit values.
    pub const fn new(added: u64, deleted: u64) -> Self {
        Self { added, deleted }
    }
}

/// Tags derived from a path, its change kind and the backend binary probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Language name from the extension table; empty when unknown.
    ///
    /// Serialized at the change level rather than inside the tag block.
    #[serde(skip)]
    pub language: String,
    /// The change added the path.
    pub is_new: bool,
    /// The change renamed the path.
    pub is_rename: bool,
    /// Binary by extension or by backend probe.
    pub is_binary: bool,
    /// Build output, vendored or otherwise machine-produced.
    pub is_generated: bool,
    /// Test source or fixture.
    pub is_test: bool,
    /// Build, tooling or configuration file.
    pub is_config: bool,
}

/// Per-file history links. Not populated yet; kept for schema stability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHistory {
    /// Commits that touched the file within the history range.
    #[serde(default)]
    pub related_commits: Vec<String>,
}

/// One path's transition between two trees, as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChangeRecordFields")]
pub struct ChangeRecord {
    /// Before/after paths.
    pub path: ChangePath,
    /// Kind of transition.
    pub change_type: ChangeKind,
    /// Mirrors `classification.language`.
    #[serde(default)]
    pub language: String,
    /// Added/deleted line counts.
    #[serde(default)]
    pub lines: LineStats,
    /// Derived tags.
    #[serde(default)]
    pub classification: Classification,
    /// Related history, currently always empty.
    #[serde(default)]
    pub history: FileHistory,
}

/// Wire shape of [`ChangeRecord`]; the language is restored into the
/// classification on the way in.
#[derive(Deserialize)]
struct ChangeRecordFields {
    path: ChangePath,
    change_type: ChangeKind,
    #[serde(default)]
    language: String,
    #[serde(default)]
    lines: LineStats,
    #[serde(default)]
    classification: Classification,
    #[serde(default)]
    history: FileHistory,
}

impl From<ChangeRecordFields> for ChangeRecord {
    fn from(fields: ChangeRecordFields) -> Self {
        let mut classification = fields.classification;
        classification.language.clone_from(&fields.language);
        Self {
            path: fields.path,
            change_type: fields.change_type,
            language: fields.language,
            lines: fields.lines,
            classification,
            history: fields.history,
        }
    }
}

impl ChangeRecord {
    /// Build a record from a classified change. Binary files never carry
    /// line counts.
    pub fn new(
        path: ChangePath,
        change_type: ChangeKind,
        lines: LineStats,
        classification: Classification,
    ) -> Self {
        let lines = if classification.is_binary {
            LineStats::ZERO
        } else {
            lines
        };
        Self {
            path,
            change_type,
            language: classification.language.clone(),
            lines,
            classification,
            history: FileHistory::default(),
        }
    }
}

/// User-specified exclusion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// A path ending with any of these is excluded.
    #[serde(default)]
    pub exclude_suffixes: Vec<String>,
    /// A path starting with any of these is excluded.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

impl FilterRule {
    /// Construct a rule from suffix and prefix lists.
    pub fn new(exclude_suffixes: Vec<String>, exclude_paths: Vec<String>) -> Self {
        Self {
            exclude_suffixes,
            exclude_paths,
        }
    }

    /// True when the rule can never exclude anything.
    pub fn is_empty(&self) -> bool {
        self.exclude_suffixes.is_empty() && self.exclude_paths.is_empty()
    }
}

/// Per-kind file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounts {
    /// Added files.
    pub added: usize,
    /// Modified files.
    pub modified: usize,
    /// Deleted files.
    pub deleted: usize,
    /// Renamed files.
    pub renamed: usize,
}

impl FileCounts {
    /// Sum over all kinds.
    pub const fn total(&self) -> usize {
        self.added + self.modified + self.deleted + self.renamed
    }
}

/// Aggregate line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    /// Total added lines.
    pub added: u64,
    /// Total deleted lines.
    pub deleted: u64,
    /// `added - deleted`.
    pub net: i64,
}

/// Summary over the non-excluded changes of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Per-kind file counts.
    pub files: FileCounts,
    /// Line totals.
    pub lines: LineTotals,
}
