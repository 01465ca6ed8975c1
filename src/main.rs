//! workscope - Discover agent workspaces once, then run with narrowed mounts.
//!
//! Usage:
//!   workscope scan [ROOTS]...   Find `.claude/agents` workspaces and register them
//!   workscope plan              Print the narrowed mounts for a record file
//!   workscope setup             Scan in a wide sandbox, then start the narrowed one
//!   workscope --help            Show help

use std::path::{Path, PathBuf};
use std::thread;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use workscope_core::{CrawlConfig, EnvSnapshot, Platform, WorkspacesFile};
use workscope_mount::{DockerCli, MountPlanner, SetupConfig, SetupPipeline, WideMountDetector};
use workscope_registry::{WorkspaceRegistry, default_record_path};
use workscope_scan::{MarkerCrawler, RootResolver};

/// Environment variable with the highest-priority log filter.
const LOG_ENV: &str = "WORKSCOPE_LOG";

#[derive(Parser)]
#[command(
    name = "workscope",
    version,
    about = "Discover agent workspaces and narrow sandbox mounts to them",
    long_about = "workscope finds directories containing `.claude/agents` without walking \
                  the whole filesystem, records them, and computes the minimal set of \
                  mounts a sandbox needs to reach them."
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl for workspaces and register them
    Scan {
        /// Roots to scan (comma, semicolon or newline separated lists allowed)
        roots: Vec<String>,

        /// Maximum directory depth below each root
        #[arg(long, value_name = "N", allow_hyphen_values = true)]
        max_depth: Option<String>,

        /// Record file (defaults to WORKSCOPE_WORKSPACES_FILE or ~/.workscope/workspaces.json)
        #[arg(long, value_name = "PATH")]
        workspaces_file: Option<PathBuf>,

        /// Only print what was found
        #[arg(long)]
        no_register: bool,
    },

    /// Print the narrowed mount plan for a record file
    Plan {
        /// Record file to plan from
        #[arg(long, value_name = "PATH")]
        workspaces_file: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan inside a wide sandbox, then start the workload with narrowed mounts
    Setup,
}

/// Values read from the process once at startup.
struct Ambient {
    env: EnvSnapshot,
    platform: Platform,
    cwd: PathBuf,
    home: PathBuf,
}

impl Ambient {
    fn capture() -> Result<Self> {
        let cwd = std::env::current_dir().wrap_err("Cannot read current directory")?;
        let home = dirs::home_dir().unwrap_or_else(|| cwd.clone());
        Ok(Self {
            env: EnvSnapshot::capture(),
            platform: Platform::current(),
            cwd,
            home,
        })
    }

    fn record_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| default_record_path(&self.env, &self.home))
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let ambient = Ambient::capture()?;
    init_logging(&ambient.env, cli.verbose, cli.quiet);

    match cli.command {
        Command::Scan {
            roots,
            max_depth,
            workspaces_file,
            no_register,
        } => {
            let record_path = ambient.record_path(workspaces_file);
            run_scan(
                &ambient,
                &roots,
                max_depth.as_deref(),
                (!no_register).then_some(record_path.as_path()),
            )?;
        }
        Command::Plan {
            workspaces_file,
            json,
        } => {
            let record_path = ambient.record_path(workspaces_file);
            run_plan(&ambient, &record_path, json)?;
        }
        Command::Setup => {
            run_setup(&ambient)?;
        }
    }

    Ok(())
}

/// `WORKSCOPE_LOG`, then `RUST_LOG`, then the verbosity flags.
fn init_logging(env: &EnvSnapshot, verbose: u8, quiet: bool) {
    let fallback = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(|key| env.get_non_empty(key))
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Crawl the resolved roots and register what was found.
fn run_scan(
    ambient: &Ambient,
    cli_roots: &[String],
    max_depth: Option<&str>,
    record_path: Option<&Path>,
) -> Result<()> {
    let resolver = RootResolver::new(
        ambient.platform,
        ambient.env.clone(),
        ambient.cwd.clone(),
        ambient.home.clone(),
    );
    let resolved = resolver.resolve(cli_roots, max_depth);

    tracing::info!(
        "Scanning {} root{} up to depth {}",
        resolved.roots.len(),
        plural(resolved.roots.len()),
        resolved.max_depth
    );

    let crawler = MarkerCrawler::new(CrawlConfig::default());
    let mut progress_rx = crawler.subscribe();
    let reporter = thread::spawn(move || {
        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => tracing::debug!(
                    "{} directories read ({:.0}/s), {} workspaces, at {}",
                    progress.dirs_read,
                    progress.dirs_per_second(),
                    progress.workspaces_found,
                    progress.current_path.display()
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let discovery = crawler.discover(&resolved.roots, resolved.max_depth);
    drop(crawler);
    let _ = reporter.join();

    tracing::debug!(
        "Read {} directories ({} unreadable) in {:.2}s",
        discovery.stats.dirs_read,
        discovery.stats.unreadable,
        discovery.duration.as_secs_f64()
    );

    if discovery.is_empty() {
        println!("No .claude/agents directories found.");
        return Ok(());
    }

    println!(
        "Discovered {} workspace{}.",
        discovery.len(),
        plural(discovery.len())
    );
    for workspace in &discovery.workspaces {
        println!("  {}", workspace.display());
    }

    let Some(record_path) = record_path else {
        return Ok(());
    };

    let mut registry = WorkspaceRegistry::open(record_path)
        .wrap_err_with(|| format!("Cannot open {}", record_path.display()))?;
    let summary = registry
        .register_bulk(&discovery.workspaces)
        .wrap_err("Failed to register workspaces")?;

    println!(
        "Registered {} new workspace{} (updated {}, skipped {}).",
        summary.added,
        plural(summary.added),
        summary.updated,
        summary.skipped
    );
    println!("Total registered workspaces: {}", registry.workspaces().len());

    Ok(())
}

/// Plan narrowed mounts for a record file against the wide mounts of this host.
fn run_plan(ambient: &Ambient, record_path: &Path, json: bool) -> Result<()> {
    let raw = match std::fs::read_to_string(record_path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).wrap_err_with(|| format!("Cannot read {}", record_path.display()));
        }
    };
    let record = WorkspacesFile::parse_lenient(&raw);

    let wide = WideMountDetector::new(ambient.env.clone()).detect()?;
    let plan = MountPlanner::new().plan(record.paths(), &wide);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for mount in &plan.mounts {
            println!("-v {}", mount.volume_arg());
        }
    }

    Ok(())
}

/// Run the full scan-then-narrow sequence with Docker.
fn run_setup(ambient: &Ambient) -> Result<()> {
    let wide = WideMountDetector::new(ambient.env.clone()).detect()?;
    for mount in &wide {
        tracing::info!("Wide mount {mount}");
    }

    let config = SetupConfig::from_env(&ambient.env);
    let pipeline = SetupPipeline::new(config, DockerCli::new());
    let report = pipeline.run(&wide).wrap_err("Setup failed")?;

    println!(
        "{} running with {} mount{}{}",
        pipeline.config().run_container,
        report.plan.mounts.len(),
        plural(report.plan.mounts.len()),
        if report.plan.is_fallback() {
            " (wide fallback)"
        } else {
            ""
        }
    );

    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_depth(args: &[&str]) -> Option<String> {
        match Cli::try_parse_from(args).unwrap().command {
            Command::Scan { max_depth, .. } => max_depth,
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_negative_depth_reaches_fallback() {
        assert_eq!(
            scan_depth(&["workscope", "scan", "--max-depth", "-1"]).as_deref(),
            Some("-1")
        );
        assert_eq!(
            scan_depth(&["workscope", "scan", "--max-depth=-1"]).as_deref(),
            Some("-1")
        );
        assert_eq!(
            scan_depth(&["workscope", "scan", "--max-depth", "deep", "/srv"]).as_deref(),
            Some("deep")
        );
    }

    #[test]
    fn test_roots_after_depth_flag() {
        let cli = Cli::try_parse_from(["workscope", "scan", "--max-depth", "3", "/a", "/b"]).unwrap();
        match cli.command {
            Command::Scan { roots, max_depth, .. } => {
                assert_eq!(roots, vec!["/a", "/b"]);
                assert_eq!(max_depth.as_deref(), Some("3"));
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
