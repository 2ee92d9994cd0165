//! Commit and compare URLs for the common forges.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Length of the abbreviated hashes used in compare URLs.
pub const SHORT_HASH_LEN: usize = 7;

/// Forge hosting a remote, detected from the host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forge {
    /// github.com
    GitHub,
    /// gitlab.com
    GitLab,
    /// bitbucket.org
    Bitbucket,
    /// Anything else; GitHub conventions are assumed.
    Other,
}

impl Forge {
    fn from_host(host: &str) -> Self {
        if host.contains("github.com") {
            Self::GitHub
        } else if host.contains("gitlab.com") {
            Self::GitLab
        } else if host.contains("bitbucket.org") {
            Self::Bitbucket
        } else {
            Self::Other
        }
    }
}

/// URL builder for a normalized remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeLinks {
    base: Option<(String, Forge)>,
}

impl ForgeLinks {
    /// Links for a remote already passed through [`normalize_remote_url`].
    /// Empty or unparsable URLs produce empty links.
    #[must_use]
    pub fn new(remote_url: &str) -> Self {
        let base = Url::parse(remote_url).ok().and_then(|url| {
            url.host_str()
                .map(|host| (remote_url.to_owned(), Forge::from_host(host)))
        });
        Self { base }
    }

    /// Detected forge, if there is a usable remote.
    #[must_use]
    pub fn forge(&self) -> Option<Forge> {
        self.base.as_ref().map(|(_, forge)| *forge)
    }

    /// Link to a single commit, using the full hash.
    #[must_use]
    pub fn commit_url(&self, hash: &str) -> String {
        match &self.base {
            Some((base, Forge::Bitbucket)) => format!("{base}/commits/{hash}"),
            Some((base, _)) => format!("{base}/commit/{hash}"),
            None => String::new(),
        }
    }

    /// Link to the compare page between `base` and `target`.
    #[must_use]
    pub fn compare_url(&self, base: &str, target: &str) -> String {
        let (from, to) = (short_hash(base), short_hash(target));
        match &self.base {
            Some((url, Forge::Bitbucket)) => format!("{url}/branches/compare/{to}..{from}"),
            Some((url, _)) => format!("{url}/compare/{from}...{to}"),
            None => String::new(),
        }
    }
}

/// First [`SHORT_HASH_LEN`] characters of `hash`, or all of it when shorter.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

/// Turn a remote URL into a browsable `https` URL without a `.git` suffix.
///
/// Handles `http(s)://`, `ssh://`, `git@host:path` and `host:path` forms;
/// anything else is returned unchanged.
#[must_use]
pub fn normalize_remote_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http") {
        return strip_git(raw).to_owned();
    }

    if raw.starts_with("ssh://") {
        if let Ok(url) = Url::parse(raw) {
            if let Some(host) = url.host_str() {
                return format!("https://{host}{}", strip_git(url.path()));
            }
        }
        return raw.to_owned();
    }

    if let Some(captures) = scp_user_pattern().and_then(|re| re.captures(raw)) {
        return format!("https://{}/{}", &captures[1], strip_git(&captures[2]));
    }

    if !raw.contains("://") {
        if let Some((host, path)) = raw.split_once(':') {
            return format!("https://{host}/{}", strip_git(path));
        }
    }

    raw.to_owned()
}

/// Repository name from a normalized remote URL, or `unknown`.
#[must_use]
pub fn repository_name(remote_url: &str) -> String {
    remote_url
        .rsplit('/')
        .next()
        .map(strip_git)
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

fn strip_git(value: &str) -> &str {
    value.strip_suffix(".git").unwrap_or(value)
}

fn scp_user_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^git@([^:]+):(.+)$").ok())
        .as_ref()
}
