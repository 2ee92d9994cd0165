//! Environment variables the CLI falls back to, and cleanup of the
//! exclusion lists gathered from flags or the environment.

use diffscope_api::FilterRule;

/// Repository path used when `--repo` is absent.
pub const REPO_PATH_VAR: &str = "DIFFSCOPE_REPO_PATH";
/// Comma-separated suffix exclusions used when `--exclude-suffix` is absent.
pub const EXCLUDE_SUFFIXES_VAR: &str = "DIFFSCOPE_EXCLUDE_SUFFIXES";
/// Comma-separated path-prefix exclusions used when `--exclude-path` is absent.
pub const EXCLUDE_PATHS_VAR: &str = "DIFFSCOPE_EXCLUDE_PATHS";

/// Build the exclusion rule from raw list entries.
///
/// Entries are trimmed and blank ones dropped: an empty pattern matches every
/// path, so `a,,b` or a stray trailing comma must not exclude the whole tree.
#[must_use]
pub fn exclusion_rule(suffixes: Vec<String>, paths: Vec<String>) -> FilterRule {
    FilterRule::new(clean(suffixes), clean(paths))
}

fn clean(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}
