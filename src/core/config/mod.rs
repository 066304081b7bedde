//! # Config Module
//!
//! Runtime settings for the optimizer, validated once at startup.
//!
//! Values normally arrive from the CLI, where each has a flag and an
//! environment variable (`VR_SOURCE_PATH`, `VR_CACHE_PATH`, ...). Invalid
//! values are the only fatal errors in the system.

use crate::core::encoder::{ToolPaths, THUMBNAIL_TIMEOUT, VARIANT_TIMEOUT};
use crate::core::generator::GeneratorConfig;
use crate::core::janitor::DEFAULT_RETENTION;
use crate::core::thumbnail::ThumbnailSpec;
use crate::core::variants::QualityTable;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SOURCE_ROOT: &str = "/usr/share/nginx/html/vr";
pub const DEFAULT_CACHE_ROOT: &str = "/var/cache/nginx/vr";
pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_OPTIMIZE_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(86400);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Tree scanned for source panoramas
    pub source_root: PathBuf,
    /// Root of the derived cache tree
    pub cache_root: PathBuf,
    /// Base encoder quality; tier qualities are offsets from it
    pub base_quality: u8,
    /// Assets processed concurrently
    pub workers: usize,
    pub optimize_interval: Duration,
    pub cleanup_interval: Duration,
    /// Derived files older than this are expired
    pub retention: Duration,
    /// Extra wait after a failed cycle
    pub error_backoff: Duration,
    pub variant_timeout: Duration,
    pub thumbnail_timeout: Duration,
    pub tools: ToolPaths,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from(DEFAULT_SOURCE_ROOT),
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            base_quality: QualityTable::DEFAULT_BASE,
            workers: DEFAULT_WORKERS,
            optimize_interval: DEFAULT_OPTIMIZE_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            retention: DEFAULT_RETENTION,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            variant_timeout: VARIANT_TIMEOUT,
            thumbnail_timeout: THUMBNAIL_TIMEOUT,
            tools: ToolPaths::default(),
        }
    }
}

impl OptimizerConfig {
    /// Check every value and derive the per-cycle encoding settings
    pub fn validate(&self) -> Result<GeneratorConfig, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let intervals = [
            ("optimize_interval", self.optimize_interval),
            ("cleanup_interval", self.cleanup_interval),
            ("retention", self.retention),
            ("variant_timeout", self.variant_timeout),
            ("thumbnail_timeout", self.thumbnail_timeout),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::ZeroInterval { name });
        }

        Ok(GeneratorConfig {
            qualities: QualityTable::from_base(self.base_quality)?,
            variant_timeout: self.variant_timeout,
            thumbnail: ThumbnailSpec {
                timeout: self.thumbnail_timeout,
                ..ThumbnailSpec::default()
            },
        })
    }
}
