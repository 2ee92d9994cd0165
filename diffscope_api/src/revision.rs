use std::fmt;

use serde::{Deserialize, Serialize};

/// How a human-supplied reference string resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// A local or remote-tracking branch.
    Branch,
    /// A lightweight or annotated tag.
    Tag,
    /// Anything else that names a commit (full or abbreviated hash, `HEAD~2`, ...).
    Commit,
}

impl RefKind {
    /// Wire name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved, content-addressed revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Full object identifier (e.g., git SHA).
    pub oid: String,
    /// What the original reference string named.
    pub kind: RefKind,
}

impl Revision {
    /// Convenience constructor.
    pub fn new(oid: impl Into<String>, kind: RefKind) -> Self {
        Self {
            oid: oid.into(),
            kind,
        }
    }

    /// A revision that is only known by its hash.
    pub fn commit(oid: impl Into<String>) -> Self {
        Self::new(oid, RefKind::Commit)
    }
}
