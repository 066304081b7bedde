//! # CLI Module
//!
//! Command-line interface for the VR content optimizer.
//!
//! Every setting has a flag and an environment variable; a `.env` file in the
//! working directory is loaded first.
//!
//! ## Usage
//! ```bash
//! # Long-running service: optimize hourly, sweep daily
//! vr-optimizer run
//!
//! # One cycle with a progress bar
//! vr-optimizer optimize --source ./vr --cache ./cache
//!
//! # Expire old cache files now
//! vr-optimizer cleanup --retention-days 7
//!
//! # How many sources are fully optimized
//! vr-optimizer status --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use vr_optimizer::core::config::{
    OptimizerConfig, DEFAULT_CACHE_ROOT, DEFAULT_ERROR_BACKOFF, DEFAULT_SOURCE_ROOT,
};
use vr_optimizer::core::encoder::{ToolPaths, THUMBNAIL_TIMEOUT, VARIANT_TIMEOUT};
use vr_optimizer::core::janitor::SweepReport;
use vr_optimizer::core::pipeline::{CycleReport, Optimizer};
use vr_optimizer::core::status::{collect_status, StatusReport};
use vr_optimizer::core::variants::CacheLayout;
use vr_optimizer::core::{CacheJanitor, Scheduler, VariantStatus};
use vr_optimizer::error::{ConfigError, OptimizerError, Result};
use vr_optimizer::events::{AssetEvent, CycleEvent, Event, EventChannel};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// VR Content Optimizer - web-ready variants for 360° panoramas
#[derive(Parser, Debug)]
#[command(name = "vr-optimizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory scanned for source panoramas
    #[arg(long = "source", env = "VR_SOURCE_PATH", default_value = DEFAULT_SOURCE_ROOT, global = true)]
    source: PathBuf,

    /// Root of the derived cache tree
    #[arg(long = "cache", env = "VR_CACHE_PATH", default_value = DEFAULT_CACHE_ROOT, global = true)]
    cache: PathBuf,

    /// Base encoder quality (tiers use +5, -5, -15)
    #[arg(long, env = "OPTIMIZATION_QUALITY", default_value_t = 85, global = true)]
    quality: u8,

    /// Sources processed in parallel
    #[arg(short, long, env = "VR_OPTIMIZER_WORKERS", default_value_t = 2, global = true)]
    workers: usize,

    /// Seconds between optimization cycles
    #[arg(long, env = "VR_OPTIMIZATION_INTERVAL", default_value_t = 3600, global = true)]
    interval: u64,

    /// Seconds between cache sweeps
    #[arg(long, env = "VR_CLEANUP_INTERVAL", default_value_t = 86400, global = true)]
    cleanup_interval: u64,

    /// Age in days after which cached files are removed
    #[arg(long, env = "VR_CACHE_RETENTION_DAYS", default_value_t = 30, global = true)]
    retention_days: u64,

    /// ImageMagick executable
    #[arg(long, env = "VR_MAGICK_BIN", default_value = "magick", global = true)]
    magick: PathBuf,

    /// cwebp executable
    #[arg(long, env = "VR_CWEBP_BIN", default_value = "cwebp", global = true)]
    cwebp: PathBuf,

    /// ImageMagick identify executable
    #[arg(long, env = "VR_IDENTIFY_BIN", default_value = "identify", global = true)]
    identify: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize and clean up on a schedule until interrupted
    Run,
    /// Run a single optimization cycle
    Optimize {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Remove cached files older than the retention window
    Cleanup {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Report optimization progress per source
    Status {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

impl Cli {
    fn optimizer_config(&self) -> std::result::Result<OptimizerConfig, ConfigError> {
        let retention_secs = self
            .retention_days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or(ConfigError::RetentionOverflow {
                days: self.retention_days,
            })?;

        Ok(OptimizerConfig {
            source_root: self.source.clone(),
            cache_root: self.cache.clone(),
            base_quality: self.quality,
            workers: self.workers,
            optimize_interval: Duration::from_secs(self.interval),
            cleanup_interval: Duration::from_secs(self.cleanup_interval),
            retention: Duration::from_secs(retention_secs),
            error_backoff: DEFAULT_ERROR_BACKOFF,
            variant_timeout: VARIANT_TIMEOUT,
            thumbnail_timeout: THUMBNAIL_TIMEOUT,
            tools: ToolPaths {
                magick: self.magick.clone(),
                cwebp: self.cwebp.clone(),
                identify: self.identify.clone(),
            },
        })
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let daemon = matches!(cli.command, Commands::Run);
    let level = match (cli.verbose, daemon) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    vr_optimizer::init_tracing(level);

    let config = cli.optimizer_config()?;
    match cli.command {
        Commands::Run => run_daemon(config),
        Commands::Optimize { output } => run_optimize(config, output, cli.verbose),
        Commands::Cleanup { output } => run_cleanup(config, output),
        Commands::Status { output } => run_status(config, output, cli.verbose),
    }
}

fn run_daemon(config: OptimizerConfig) -> Result<()> {
    info!(
        "VR optimizer starting: source {}, cache {}, {} workers",
        config.source_root.display(),
        config.cache_root.display(),
        config.workers
    );
    let optimizer = Optimizer::builder(config).build()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| OptimizerError::Signal(e.to_string()))?;

    Scheduler::new(optimizer).run(&shutdown);
    Ok(())
}

fn run_optimize(config: OptimizerConfig, output: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();
    let optimizer = Optimizer::builder(config).build()?;

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("VR Content Optimizer").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(bar_style);
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Cycle(CycleEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Asset(AssetEvent::Started { total_assets }) => {
                    pb.set_length(total_assets as u64);
                }
                Event::Asset(AssetEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!(
                            "{} ({} variants)",
                            p.current_path.file_name().unwrap_or_default().to_string_lossy(),
                            p.variants_ready
                        ));
                    }
                }
                Event::Cycle(CycleEvent::Completed { .. }) | Event::Cycle(CycleEvent::Failed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = optimizer.run_cycle_with_events(&sender);

    drop(sender);
    event_thread.join().ok();

    let report = result?;
    match output {
        OutputFormat::Pretty => print_pretty_cycle(&term, &report, verbose),
        OutputFormat::Json => print_json(&serde_json::json!({
            "summary": report.summary,
            "scan_errors": report.scan_errors,
            "assets": report.assets.iter().filter(|a| a.is_panoramic()).map(|a| {
                serde_json::json!({
                    "source": a.source,
                    "variants_ready": a.success_count(),
                    "variants": a.variants,
                    "thumbnail": a.thumbnail.map(|t| t.is_success()),
                    "metadata": a.sidecar_written,
                })
            }).collect::<Vec<_>>(),
        }))?,
    }

    Ok(())
}

fn run_cleanup(config: OptimizerConfig, output: OutputFormat) -> Result<()> {
    config.validate()?;
    let janitor = CacheJanitor::new(CacheLayout::new(&config.cache_root), config.retention);
    let report = janitor.sweep();

    match output {
        OutputFormat::Pretty => print_pretty_sweep(&Term::stderr(), &report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn run_status(config: OptimizerConfig, output: OutputFormat, verbose: bool) -> Result<()> {
    config.validate()?;
    let report = collect_status(&config.source_root, &CacheLayout::new(&config.cache_root))?;

    match output {
        OutputFormat::Pretty => print_pretty_status(&Term::stderr(), &report, verbose),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_pretty_cycle(term: &Term, report: &CycleReport, verbose: bool) {
    let summary = &report.summary;

    term.write_line(&format!(
        "{} Optimization Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images scanned in {:.1}s",
        style(summary.total_assets).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} panoramas processed, {} skipped",
        style(summary.processed).cyan(),
        style(summary.skipped).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} variants encoded, {} already up to date",
        style(summary.variants_encoded).cyan(),
        style(summary.variants_fresh).dim()
    ))
    .ok();

    if summary.variants_failed > 0 || summary.failed > 0 {
        term.write_line(&format!(
            "  {} variants failed ({} panoramas with nothing usable)",
            style(summary.variants_failed).red(),
            style(summary.failed).red()
        ))
        .ok();
    }
    if report.scan_errors > 0 {
        term.write_line(&format!(
            "  {} unreadable entries skipped during scan",
            style(report.scan_errors).yellow()
        ))
        .ok();
    }

    if verbose {
        term.write_line("").ok();
        for asset in report.assets.iter().filter(|a| a.is_panoramic()) {
            term.write_line(&format!(
                "  {} {}/9",
                style(asset.source.display()).bold(),
                asset.success_count()
            ))
            .ok();
            for variant in &asset.variants {
                if let VariantStatus::Failed { reason } = &variant.status {
                    term.write_line(&format!(
                        "    {} {} {}",
                        style("✗").red(),
                        variant.key,
                        style(reason).dim()
                    ))
                    .ok();
                }
            }
        }
    }
}

fn print_pretty_sweep(term: &Term, report: &SweepReport) {
    term.write_line(&format!("{} Cleanup Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();
    term.write_line(&format!(
        "  {} files removed ({})",
        style(report.removed).cyan(),
        style(format_bytes(report.bytes_freed)).yellow()
    ))
    .ok();
    term.write_line(&format!("  {} files kept", style(report.retained).dim()))
        .ok();
    if report.failed > 0 {
        term.write_line(&format!(
            "  {} files could not be removed",
            style(report.failed).red()
        ))
        .ok();
    }
}

fn print_pretty_status(term: &Term, report: &StatusReport, verbose: bool) {
    term.write_line(&format!(
        "{}",
        style("VR Content Status").bold().underlined()
    ))
    .ok();
    term.write_line("").ok();
    term.write_line(&format!(
        "  {} source images in {}",
        style(report.total_sources).cyan(),
        report.source_root.display()
    ))
    .ok();
    term.write_line(&format!(
        "  {} fully optimized",
        style(report.fully_optimized).green()
    ))
    .ok();
    term.write_line(&format!(
        "  {} cached files in {}",
        style(report.total_cached_files).cyan(),
        report.cache_root.display()
    ))
    .ok();

    if verbose {
        term.write_line("").ok();
        for source in &report.sources {
            let marker = if source.fully_optimized {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };
            term.write_line(&format!(
                "    {} {} ({}/9)",
                marker,
                source.path.display(),
                source.variants_count
            ))
            .ok();
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
