//! Optimization cycle implementation.

use crate::core::config::OptimizerConfig;
use crate::core::encoder::{CommandBackend, ImageBackend};
use crate::core::generator::{AssetReport, GeneratorConfig, VariantGenerator, VariantStatus};
use crate::core::scanner::{ScanConfig, WalkDirScanner};
use crate::core::variants::CacheLayout;
use crate::error::{ConfigError, OptimizerError};
use crate::events::{
    null_sender, AssetEvent, AssetProgress, CycleEvent, CyclePhase, CycleSummary, Event,
    EventSender,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of one optimization cycle
#[derive(Debug)]
pub struct CycleReport {
    pub summary: CycleSummary,
    /// Per-source outcomes, in completion order
    pub assets: Vec<AssetReport>,
    /// Non-fatal walk errors (unreadable entries)
    pub scan_errors: usize,
}

/// Builder for [`Optimizer`]
pub struct OptimizerBuilder {
    config: OptimizerConfig,
    backend: Option<Arc<dyn ImageBackend>>,
}

impl OptimizerBuilder {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// Replace the default [`CommandBackend`]
    pub fn backend(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Validate the configuration, create the cache tree and size the worker pool
    pub fn build(self) -> Result<Optimizer, ConfigError> {
        let generator = self.config.validate()?;

        let layout = CacheLayout::new(&self.config.cache_root);
        layout.ensure_dirs().map_err(|e| ConfigError::CacheRoot {
            path: self.config.cache_root.clone(),
            reason: e.to_string(),
        })?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("vr-optimizer-{}", i))
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(CommandBackend::new(self.config.tools.clone())));

        Ok(Optimizer {
            scanner: WalkDirScanner::new(ScanConfig::default()),
            config: self.config,
            generator,
            layout,
            backend,
            pool,
        })
    }
}

/// Runs optimization cycles over one source tree and cache tree
pub struct Optimizer {
    config: OptimizerConfig,
    generator: GeneratorConfig,
    layout: CacheLayout,
    backend: Arc<dyn ImageBackend>,
    scanner: WalkDirScanner,
    pool: ThreadPool,
}

impl Optimizer {
    pub fn builder(config: OptimizerConfig) -> OptimizerBuilder {
        OptimizerBuilder::new(config)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Run one cycle without events
    pub fn run_cycle(&self) -> Result<CycleReport, OptimizerError> {
        self.run_cycle_with_events(&null_sender())
    }

    /// Scan, then bring every panoramic source up to date on the worker pool.
    ///
    /// Returns once every asset task has finished. Only a missing source root
    /// fails the cycle; asset and variant failures are counted in the report.
    pub fn run_cycle_with_events(&self, events: &EventSender) -> Result<CycleReport, OptimizerError> {
        let start_time = Instant::now();
        let source_root = self.config.source_root.as_path();

        events.send(Event::Cycle(CycleEvent::Started {
            source_root: source_root.to_path_buf(),
        }));
        events.send(Event::Cycle(CycleEvent::PhaseChanged {
            phase: CyclePhase::Scanning,
        }));

        let scan_result = match self.scanner.scan(source_root) {
            Ok(result) => result,
            Err(e) => {
                warn!("VR source path does not exist: {}", source_root.display());
                events.send(Event::Cycle(CycleEvent::Failed {
                    message: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        let assets = scan_result.assets;
        let total = assets.len();
        info!("Found {} candidate images in {}", total, source_root.display());

        events.send(Event::Cycle(CycleEvent::PhaseChanged {
            phase: CyclePhase::Optimizing,
        }));
        events.send(Event::Asset(AssetEvent::Started {
            total_assets: total,
        }));

        let generator = VariantGenerator::new(self.backend.as_ref(), &self.layout, &self.generator);
        let completed = AtomicUsize::new(0);

        let reports: Vec<AssetReport> = self.pool.install(|| {
            assets
                .par_iter()
                .map(|asset| {
                    let report = generator.process(asset);

                    for variant in &report.variants {
                        if let VariantStatus::Failed { reason } = &variant.status {
                            events.send(Event::Asset(AssetEvent::VariantFailed {
                                path: asset.path.clone(),
                                key: variant.key.to_string(),
                                message: reason.clone(),
                            }));
                        }
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    events.send(Event::Asset(AssetEvent::Progress(AssetProgress {
                        completed: done,
                        total,
                        current_path: asset.path.clone(),
                        variants_ready: report.success_count(),
                    })));

                    report
                })
                .collect()
        });

        events.send(Event::Asset(AssetEvent::Completed {
            processed: reports.len(),
        }));

        let summary = summarize(&reports, start_time.elapsed().as_millis() as u64);
        info!(
            "VR content optimization completed: {}/{} panoramas processed, {} skipped, {} variants encoded, {} up to date",
            summary.processed,
            summary.processed + summary.failed,
            summary.skipped,
            summary.variants_encoded,
            summary.variants_fresh
        );

        events.send(Event::Cycle(CycleEvent::Completed {
            summary: summary.clone(),
        }));

        Ok(CycleReport {
            summary,
            assets: reports,
            scan_errors: scan_result.errors.len(),
        })
    }
}

fn summarize(reports: &[AssetReport], duration_ms: u64) -> CycleSummary {
    let mut summary = CycleSummary {
        total_assets: reports.len(),
        duration_ms,
        ..Default::default()
    };

    for report in reports {
        if !report.is_panoramic() {
            summary.skipped += 1;
            continue;
        }
        if report.is_success() {
            summary.processed += 1;
        } else {
            summary.failed += 1;
        }
        summary.variants_encoded += report.encoded_count();
        summary.variants_fresh += report.fresh_count();
        summary.variants_failed += report.variants.len() - report.success_count();
    }

    summary
}
