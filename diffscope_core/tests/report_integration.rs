use std::collections::HashMap;

use diffscope_core::repository::GitBackend;
use diffscope_core::{
    generate_report, BaselineStrategy, Cancellation, ChangeKind, DiffReport, Error, FilterRule,
    LineStats, RefKind, RequestOptions, Result, EMPTY_HISTORY_NOTE,
};
use git2::{IndexEntry, IndexTime, Oid, Repository as GitRepository, Signature, Time};
use tempfile::TempDir;

const DEFAULT_OPTIONS: RequestOptions = RequestOptions {
    ignore_merge_commits: true,
    detect_renames: false,
};

#[test]
fn linear_release_report() -> Result<()> {
    let fixture = Fixture::new()?;
    let v1 = fixture.commit(
        &[("src/lib.rs", "pub fn a() {}\n"), ("README.md", "hello\n")],
        &[],
        1_000,
        "initial",
    )?;
    let second = fixture.commit(
        &[
            ("src/lib.rs", "pub fn a() {}\npub fn b() {}\n"),
            ("README.md", "hello\n"),
            ("tests/lib_test.rs", "#[test]\nfn t() {}\n"),
        ],
        &[v1],
        2_000,
        "add b",
    )?;
    let head = fixture.commit(
        &[
            ("src/lib.rs", "pub fn a() {}\npub fn b() {}\n"),
            ("tests/lib_test.rs", "#[test]\nfn t() {}\n"),
            ("Cargo.toml", "[package]\n"),
        ],
        &[second],
        3_000,
        "drop readme",
    )?;
    fixture.tag("v1.0.0", v1)?;
    fixture.branch("main", head)?;
    fixture.remote("git@github.com:acme/widget.git")?;

    let report = fixture.report("v1.0.0", "main", FilterRule::default())?;

    assert_eq!(report.resolution.from.kind, RefKind::Tag);
    assert_eq!(report.resolution.to.kind, RefKind::Branch);
    assert_eq!(report.resolution.to.commit, head.to_string());
    assert_eq!(report.baseline.strategy, BaselineStrategy::Direct);
    assert_eq!(report.baseline.base_commit, v1.to_string());
    assert_eq!(report.repository.name, "widget");
    assert_eq!(report.repository.url, "https://github.com/acme/widget");

    let files = by_path(&report);
    assert_eq!(files.len(), 4);
    assert_eq!(files["src/lib.rs"].change_type, ChangeKind::Modified);
    assert_eq!(files["src/lib.rs"].lines, LineStats::new(1, 0));
    assert_eq!(files["src/lib.rs"].language, "Rust");
    assert!(files["tests/lib_test.rs"].classification.is_test);
    assert!(files["tests/lib_test.rs"].classification.is_new);
    assert!(files["Cargo.toml"].classification.is_config);
    assert_eq!(files["README.md"].change_type, ChangeKind::Deleted);

    let summary = report.tree_diff.summary;
    assert_eq!(summary.files.total(), report.tree_diff.files.len());
    assert_eq!(
        summary.lines.net,
        i64::try_from(summary.lines.added).expect("fits")
            - i64::try_from(summary.lines.deleted).expect("fits")
    );

    let messages: Vec<_> = report
        .history_view
        .commits
        .iter()
        .map(|c| c.message.as_str())
        .collect();
    assert_eq!(messages, ["add b", "drop readme"]);
    assert_eq!(
        report.history_view.commits[0].diff_url,
        format!("https://github.com/acme/widget/commit/{second}")
    );
    assert_eq!(
        report.diff_links.version_diff.url,
        format!(
            "https://github.com/acme/widget/compare/{}...{}",
            &v1.to_string()[..7],
            &head.to_string()[..7]
        )
    );
    Ok(())
}

#[test]
fn branched_report_uses_merge_base_for_history_only() -> Result<()> {
    let fixture = Fixture::new()?;
    let root = fixture.commit(&[("a.txt", "base\n")], &[], 1_000, "root")?;
    let feature = fixture.commit(
        &[("a.txt", "base\n"), ("feature.go", "package f\n")],
        &[root],
        2_000,
        "feature",
    )?;
    let main = fixture.commit(
        &[("a.txt", "base\nmain\n")],
        &[root],
        3_000,
        "main work",
    )?;
    fixture.branch("feature", feature)?;
    fixture.branch("main", main)?;

    let report = fixture.report("feature", "main", FilterRule::default())?;

    assert_eq!(report.baseline.strategy, BaselineStrategy::MergeBase);
    assert_eq!(report.baseline.base_commit, root.to_string());
    assert!(!report.baseline.ancestry.is_linear);

    // Endpoint diff: feature.go disappears going from feature to main.
    let files = by_path(&report);
    assert_eq!(files["feature.go"].change_type, ChangeKind::Deleted);
    assert_eq!(files["a.txt"].change_type, ChangeKind::Modified);

    let hashes: Vec<_> = report
        .history_view
        .commits
        .iter()
        .map(|c| c.hash.clone())
        .collect();
    assert_eq!(hashes, [main.to_string()]);
    assert!(report.diff_links.version_diff.url.is_empty());
    Ok(())
}

#[test]
fn identical_references_collapse() -> Result<()> {
    let fixture = Fixture::new()?;
    let only = fixture.commit(&[("a.txt", "x\n")], &[], 1_000, "only")?;
    fixture.tag("v1", only)?;

    let report = fixture.report("v1", &only.to_string(), FilterRule::default())?;

    assert!(report.tree_diff.files.is_empty());
    assert!(report.history_view.commits.is_empty());
    assert_eq!(report.filters.files_filtered_out, 0);
    assert_eq!(report.baseline.base_commit, only.to_string());
    assert_eq!(report.integrity.history_note, EMPTY_HISTORY_NOTE);
    Ok(())
}

#[test]
fn excluded_and_binary_paths() -> Result<()> {
    let fixture = Fixture::new()?;
    let before = fixture.commit(&[("main.go", "package main\n")], &[], 1_000, "init")?;
    let after = fixture.commit(
        &[
            ("main.go", "package main\n\nfunc main() {}\n"),
            ("vendor/lib.go", "package lib\nvar X = 1\n"),
            ("assets/image.png", "not really a png\n"),
            ("go.sum", "h1:abc\n"),
        ],
        &[before],
        2_000,
        "vendor and assets",
    )?;

    let rule = FilterRule::new(vec![".sum".into()], vec!["vendor/".into()]);
    let report = fixture.report(&before.to_string(), &after.to_string(), rule)?;

    assert_eq!(report.filters.files_filtered_out, 2);
    assert_eq!(report.filters.binary_files_detected, 1);
    let files = by_path(&report);
    assert_eq!(files.len(), 2);
    assert!(!files.contains_key("vendor/lib.go"));
    assert!(!files.contains_key("go.sum"));

    let image = files["assets/image.png"];
    assert!(image.classification.is_binary);
    assert_eq!(image.lines, LineStats::ZERO);

    assert_eq!(report.tree_diff.summary.files.total(), 2);
    assert_eq!(report.tree_diff.summary.lines.added, 2);
    assert_eq!(report.tree_diff.summary.lines.deleted, 0);
    Ok(())
}

#[test]
fn merge_commits_follow_option() -> Result<()> {
    let fixture = Fixture::new()?;
    let root = fixture.commit(&[("a.txt", "a\n")], &[], 1_000, "root")?;
    let left = fixture.commit(&[("a.txt", "a\n"), ("l.txt", "l\n")], &[root], 2_000, "left")?;
    let right = fixture.commit(&[("a.txt", "a\n"), ("r.txt", "r\n")], &[root], 3_000, "right")?;
    let merge = fixture.commit(
        &[("a.txt", "a\n"), ("l.txt", "l\n"), ("r.txt", "r\n")],
        &[left, right],
        4_000,
        "merge",
    )?;
    let (root, merge) = (root.to_string(), merge.to_string());

    let ignored = fixture.report(&root, &merge, FilterRule::default())?;
    let messages: Vec<_> = ignored
        .history_view
        .commits
        .iter()
        .map(|c| c.message.as_str())
        .collect();
    assert_eq!(messages, ["left", "right"]);
    assert!(!ignored.history_view.options.merge_commits_included);

    let backend = GitBackend::open(fixture.path())?;
    let included = generate_report(
        &backend,
        &root,
        &merge,
        RequestOptions {
            ignore_merge_commits: false,
            detect_renames: false,
        },
        FilterRule::default(),
        &Cancellation::new(),
    )?;
    assert_eq!(included.history_view.commits.len(), 3);
    assert_eq!(included.history_view.commits[2].message, "merge");
    Ok(())
}

#[test]
fn unknown_reference_fails() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.commit(&[("a.txt", "a\n")], &[], 1_000, "root")?;

    let err = fixture
        .report("does-not-exist", "also-missing", FilterRule::default())
        .expect_err("unknown ref");

    assert!(matches!(
        err,
        Error::RefResolution { ref reference, .. } if reference == "does-not-exist"
    ));
    assert!(err.to_string().contains("does-not-exist"));
    Ok(())
}

#[test]
fn disjoint_histories_fail() -> Result<()> {
    let fixture = Fixture::new()?;
    let one = fixture.commit(&[("a.txt", "a\n")], &[], 1_000, "one")?;
    let two = fixture.commit(&[("b.txt", "b\n")], &[], 2_000, "two")?;

    let err = fixture
        .report(&one.to_string(), &two.to_string(), FilterRule::default())
        .expect_err("disjoint");

    assert!(matches!(err, Error::NoCommonAncestor { .. }));
    Ok(())
}

fn by_path(report: &DiffReport) -> HashMap<&str, &diffscope_core::ChangeRecord> {
    report
        .tree_diff
        .files
        .iter()
        .map(|file| (file.path.effective(), file))
        .collect()
}

struct Fixture {
    repo: GitRepository,
    temp: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path())?;
        Ok(Self { repo, temp })
    }

    fn path(&self) -> &std::path::Path {
        self.temp.path()
    }

    fn report(&self, from: &str, to: &str, rule: FilterRule) -> Result<DiffReport> {
        let backend = GitBackend::open(self.path())?;
        generate_report(&backend, from, to, DEFAULT_OPTIONS, rule, &Cancellation::new())
    }

    /// Commit the full file set with a fixed author time. HEAD is untouched.
    fn commit(
        &self,
        files: &[(&str, &str)],
        parents: &[Oid],
        seconds: i64,
        message: &str,
    ) -> Result<Oid> {
        let repo = &self.repo;
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

    fn branch(&self, name: &str, oid: Oid) -> Result<()> {
        self.repo
            .reference(&format!("refs/heads/{name}"), oid, true, "fixture")?;
        Ok(())
    }

    fn tag(&self, name: &str, oid: Oid) -> Result<()> {
        self.repo
            .reference(&format!("refs/tags/{name}"), oid, true, "fixture")?;
        Ok(())
    }

    fn remote(&self, url: &str) -> Result<()> {
        self.repo.remote("origin", url)?;
        Ok(())
    }
}
