//! treeseek - find files by name across a directory tree, in parallel.
//!
//! Usage:
//!   treeseek target.txt              Exact name, current directory
//!   treeseek --glob '*.rs' src       Glob match under src/
//!   treeseek --regex '^mod\.rs$' .   Regex match
//!   treeseek --help                  Show help

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use treeseek_core::{MatchKind, NamePattern, SearchConfig, SearchResult, SearchState};
use treeseek_search::{SearchProgress, Searcher};

#[derive(Parser)]
#[command(
    name = "treeseek",
    version,
    about = "Concurrent directory-tree search by file name",
    long_about = "treeseek walks a directory tree with a pool of worker threads and \
                  prints every entry whose name matches PATTERN.\n\n\
                  Unreadable directories are reported but never stop the search."
)]
struct Cli {
    /// Name to look for (exact unless --glob or --regex is given)
    pattern: String,

    /// Directory to search (defaults to the config file's root, then ".")
    path: Option<PathBuf>,

    /// Treat PATTERN as a glob
    #[arg(long, conflicts_with = "regex")]
    glob: bool,

    /// Treat PATTERN as a regular expression
    #[arg(long)]
    regex: bool,

    /// Maximum depth of reported entries (root children are depth 1)
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Number of worker threads (0 = one per CPU)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Do not follow symbolic links
    #[arg(long)]
    no_follow: bool,

    /// Skip entries whose name starts with '.'
    #[arg(long)]
    no_hidden: bool,

    /// Skip entries whose name matches this glob (repeatable)
    #[arg(short = 'i', long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Kind of entry to report
    #[arg(short = 't', long = "type", value_enum)]
    kind: Option<KindArg>,

    /// Stop the search after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Read defaults from a TOML file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Print progress updates to stderr
    #[arg(long)]
    progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    #[value(name = "f")]
    File,
    #[value(name = "d")]
    Dir,
    #[value(name = "a")]
    Any,
}

impl From<KindArg> for MatchKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => MatchKind::Files,
            KindArg::Dir => MatchKind::Directories,
            KindArg::Any => MatchKind::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    let result = run_search(&config, cli.format, cli.progress)?;

    Ok(exit_code(&result))
}

/// Log to stderr, honoring `RUST_LOG` when set.
fn init_logging(verbose: bool) {
    let default = if verbose { "treeseek=debug,treeseek_search=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge the optional config file with command-line flags; flags win.
fn build_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(file) => SearchConfig::load(file)
            .with_context(|| format!("Failed to load config {}", file.display()))?,
        None => SearchConfig::with_root("."),
    };

    if let Some(path) = &cli.path {
        config.root = path.clone();
    }

    config.pattern = Some(if cli.glob {
        NamePattern::glob(&cli.pattern)
    } else if cli.regex {
        NamePattern::regex(&cli.pattern)
    } else {
        NamePattern::exact(&cli.pattern)
    });

    if cli.max_depth.is_some() {
        config.max_depth = cli.max_depth;
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if cli.no_follow {
        config.follow_symlinks = false;
    }
    if cli.no_hidden {
        config.include_hidden = false;
    }
    config.ignore_patterns.extend(cli.ignore.iter().cloned());
    if let Some(kind) = cli.kind {
        config.match_kind = kind.into();
    }
    if let Some(secs) = cli.timeout {
        let timeout = Duration::try_from_secs_f64(secs).context("Invalid timeout")?;
        config.timeout = Some(timeout);
    }

    config.check().context("Invalid configuration")?;
    Ok(config)
}

fn run_search(config: &SearchConfig, format: OutputFormat, progress: bool) -> Result<SearchResult> {
    let searcher = Searcher::new();
    let reporter = progress.then(|| {
        let mut rx = searcher.subscribe();
        thread::spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(update) => print_progress(&update),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let mut handle = searcher
        .start(config)
        .with_context(|| format!("Cannot search {}", config.root.display()))?;

    let result = match format {
        OutputFormat::Text => {
            if let Some(stream) = handle.matches() {
                for m in stream {
                    println!("{}", m.path.display());
                }
            }
            let result = handle.wait();
            print_summary(&result);
            result
        }
        OutputFormat::Json => {
            let result = handle.wait();
            println!("{}", serde_json::to_string_pretty(&result)?);
            result
        }
    };

    // Closing the sender ends the reporter loop
    drop(searcher);
    if let Some(reporter) = reporter {
        let _ = reporter.join();
    }

    Ok(result)
}

fn print_progress(update: &SearchProgress) {
    eprintln!(
        "[{:>6.1}s] {} dirs, {} entries, {} matches, {} errors ({:.0} dirs/s)",
        update.elapsed.as_secs_f64(),
        update.dirs_scanned,
        update.entries_seen,
        update.matches_found,
        update.errors_count,
        update.dirs_per_second()
    );
}

/// Errors and totals go to stderr so stdout stays a clean list of paths.
fn print_summary(result: &SearchResult) {
    for err in &result.errors {
        eprintln!("treeseek: {err}");
    }

    let status = match result.state {
        SearchState::Completed => "completed",
        _ => "cancelled",
    };
    eprintln!(
        "{} match(es), {} error(s), {} directories in {:.2}s ({status})",
        result.matches.len(),
        result.errors.len(),
        result.stats.dirs_scanned,
        result.stats.duration.as_secs_f64()
    );
}

/// 0 when something matched, 1 when nothing did, 2 when the run was cut short.
fn exit_code(result: &SearchResult) -> ExitCode {
    if !result.completed {
        ExitCode::from(2)
    } else if result.has_matches() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
