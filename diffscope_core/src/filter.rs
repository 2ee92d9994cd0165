//! Exclusion rules over changed paths.

use diffscope_api::FilterRule;

/// Which rules a path matched. Both rule lists are always evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleHits {
    /// Index of the first matching suffix rule.
    pub suffix: Option<usize>,
    /// Index of the first matching path-prefix rule.
    pub prefix: Option<usize>,
}

impl RuleHits {
    /// True when any rule matched.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.suffix.is_some() || self.prefix.is_some()
    }
}

/// Predicate over paths built from a [`FilterRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    rule: FilterRule,
}

impl ExclusionFilter {
    /// Filter for the given rule.
    #[must_use]
    pub const fn new(rule: FilterRule) -> Self {
        Self { rule }
    }

    /// The rule in effect.
    #[must_use]
    pub const fn rule(&self) -> &FilterRule {
        &self.rule
    }

    /// Evaluate both suffix and prefix rules against `path`.
    #[must_use]
    pub fn evaluate(&self, path: &str) -> RuleHits {
        evaluate(path, &self.rule)
    }

    /// Whether `path` is excluded by any rule.
    #[must_use]
    pub fn should_exclude(&self, path: &str) -> bool {
        self.evaluate(path).is_excluded()
    }
}

/// Whether `path` is excluded by `rule`.
#[must_use]
pub fn should_exclude(path: &str, rule: &FilterRule) -> bool {
    evaluate(path, rule).is_excluded()
}

fn evaluate(path: &str, rule: &FilterRule) -> RuleHits {
    RuleHits {
        suffix: first_match(&rule.exclude_suffixes, |s| path.ends_with(s)),
        prefix: first_match(&rule.exclude_paths, |p| path.starts_with(p)),
    }
}

fn first_match(patterns: &[String], matches: impl Fn(&str) -> bool) -> Option<usize> {
    patterns
        .iter()
        .position(|pattern| matches(pattern.as_str()))
}
