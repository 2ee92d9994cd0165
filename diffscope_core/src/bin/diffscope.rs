//! diffscope: structured change reports between two git revisions.

use std::fs::File;
use std::io::{self, BufWriter, Write as _};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use diffscope_core::config::{
    exclusion_rule, EXCLUDE_PATHS_VAR, EXCLUDE_SUFFIXES_VAR, REPO_PATH_VAR,
};
use diffscope_core::presenter::write_json;
use diffscope_core::repository::GitBackend;
use diffscope_core::{Cancellation, ReportPipeline, RequestOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "diffscope")]
#[command(version, about = "Structured JSON change reports between two git revisions", long_about = None)]
#[command(after_help = "EXAMPLES:
    diffscope diff --from v1.2.0 --to main
    diffscope diff --from v1.2.0 --to HEAD --exclude-path vendor/ -o report.json")]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the changes between two references
    Diff(DiffArgs),
}

#[derive(Args)]
struct DiffArgs {
    /// Reference the report starts from (branch, tag or commit)
    #[arg(long)]
    from: String,

    /// Reference the report ends at (branch, tag or commit)
    #[arg(long)]
    to: String,

    /// Repository path
    #[arg(long, env = REPO_PATH_VAR, default_value = ".")]
    repo: Utf8PathBuf,

    /// Exclude paths ending with this suffix (repeatable or comma-separated)
    #[arg(
        long = "exclude-suffix",
        value_name = "SUFFIX",
        env = EXCLUDE_SUFFIXES_VAR,
        value_delimiter = ','
    )]
    exclude_suffixes: Vec<String>,

    /// Exclude paths starting with this prefix (repeatable or comma-separated)
    #[arg(
        long = "exclude-path",
        value_name = "PREFIX",
        env = EXCLUDE_PATHS_VAR,
        value_delimiter = ','
    )]
    exclude_paths: Vec<String>,

    /// Keep merge commits in the history view
    #[arg(long)]
    include_merges: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<Utf8PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Diff(args) => run_diff(args),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_owned()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let rule = exclusion_rule(args.exclude_suffixes, args.exclude_paths);
    let backend = GitBackend::open(&args.repo)
        .with_context(|| format!("failed to open repository at {}", args.repo))?;

    let options = RequestOptions {
        ignore_merge_commits: !args.include_merges,
        detect_renames: false,
    };
    let report = ReportPipeline::new(&backend, rule)
        .generate(&args.from, &args.to, options, &Cancellation::new())
        .with_context(|| format!("failed to build report for {}..{}", args.from, args.to))?;

    match args.output {
        Some(path) => {
            let file =
                File::create(&path).with_context(|| format!("failed to create {path}"))?;
            let mut writer = BufWriter::new(file);
            write_json(&report, &mut writer)
                .with_context(|| format!("failed to write report to {path}"))?;
            writer
                .flush()
                .with_context(|| format!("failed to write report to {path}"))?;
        }
        None => {
            let stdout = io::stdout();
            write_json(&report, stdout.lock()).context("failed to write report to stdout")?;
        }
    }
    Ok(())
}
