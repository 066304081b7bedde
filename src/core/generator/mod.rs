//! # Generator Module
//!
//! Expands one panoramic source into its nine variants plus thumbnail and sidecar.
//!
//! ## Per-variant steps
//! 1. Resolve the target path from the [`CacheLayout`]
//! 2. Reuse it if fresh (newer than the source)
//! 3. Otherwise encode into a hidden staging file with a time limit
//! 4. Reject outputs of [`MIN_OUTPUT_BYTES`] or less, then rename into place
//!
//! Failures are confined to their key: a failed AVIF never stops the WebP next to it.

use crate::core::classifier::is_panoramic;
use crate::core::encoder::{EncodeRequest, ImageBackend, VARIANT_TIMEOUT};
use crate::core::freshness::is_newer_than;
use crate::core::metadata::{write_sidecar, MetadataRecord};
use crate::core::scanner::SourceAsset;
use crate::core::thumbnail::{build_thumbnail, ThumbnailSpec, ThumbnailStatus};
use crate::core::variants::{
    source_stem, target_width, CacheLayout, QualityTable, VariantKey, VARIANT_COUNT,
};
use crate::error::EncodeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outputs this size or smaller are treated as truncated
pub const MIN_OUTPUT_BYTES: u64 = 1000;

/// Encoding settings shared by every asset in a cycle
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub qualities: QualityTable,
    pub variant_timeout: Duration,
    pub thumbnail: ThumbnailSpec,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            qualities: QualityTable::default(),
            variant_timeout: VARIANT_TIMEOUT,
            thumbnail: ThumbnailSpec::default(),
        }
    }
}

/// What happened to one variant key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantStatus {
    /// Newly written, with output size in bytes
    Encoded { bytes: u64 },
    /// Existing output was newer than the source
    Fresh,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantOutcome {
    pub key: VariantKey,
    pub path: PathBuf,
    pub status: VariantStatus,
}

impl VariantOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, VariantStatus::Failed { .. })
    }
}

/// Why an asset produced no variants at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Unreadable,
    NotPanoramic,
}

/// Result of processing one source
#[derive(Debug, Clone)]
pub struct AssetReport {
    pub source: PathBuf,
    pub skipped: Option<SkipReason>,
    pub variants: Vec<VariantOutcome>,
    pub thumbnail: Option<ThumbnailStatus>,
    pub sidecar_written: bool,
}

impl AssetReport {
    fn skipped(source: &Path, reason: SkipReason) -> Self {
        Self {
            source: source.to_path_buf(),
            skipped: Some(reason),
            variants: Vec::new(),
            thumbnail: None,
            sidecar_written: false,
        }
    }

    pub fn success_count(&self) -> usize {
        self.variants.iter().filter(|v| v.is_success()).count()
    }

    pub fn encoded_count(&self) -> usize {
        self.variants
            .iter()
            .filter(|v| matches!(v.status, VariantStatus::Encoded { .. }))
            .count()
    }

    pub fn fresh_count(&self) -> usize {
        self.variants
            .iter()
            .filter(|v| v.status == VariantStatus::Fresh)
            .count()
    }

    /// Fraction of the nine keys that are present and current
    pub fn success_ratio(&self) -> f64 {
        self.success_count() as f64 / VARIANT_COUNT as f64
    }

    /// Processed iff at least one variant succeeded
    pub fn is_success(&self) -> bool {
        self.success_count() > 0
    }

    pub fn is_panoramic(&self) -> bool {
        self.skipped.is_none()
    }
}

/// Runs the per-asset steps against one backend and cache tree
pub struct VariantGenerator<'a> {
    backend: &'a dyn ImageBackend,
    layout: &'a CacheLayout,
    config: &'a GeneratorConfig,
}

impl<'a> VariantGenerator<'a> {
    pub fn new(
        backend: &'a dyn ImageBackend,
        layout: &'a CacheLayout,
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            backend,
            layout,
            config,
        }
    }

    /// Classify `asset` and, if it is a panorama, bring all its derived files up to date
    pub fn process(&self, asset: &SourceAsset) -> AssetReport {
        let source = asset.path.as_path();

        let info = match self.backend.introspect(source) {
            Ok(info) => info,
            Err(e) => {
                warn!("Could not analyze image dimensions for {}: {}", source.display(), e);
                return AssetReport::skipped(source, SkipReason::Unreadable);
            }
        };

        if !is_panoramic(info.width, info.height) {
            info!("Skipping non-VR content: {}", source.display());
            return AssetReport::skipped(source, SkipReason::NotPanoramic);
        }

        info!("Processing VR content: {}", source.display());
        let stem = source_stem(source);

        let thumbnail = match build_thumbnail(
            self.backend,
            self.layout,
            source,
            &stem,
            &self.config.thumbnail,
        ) {
            Ok((_, status)) => status,
            Err(e) => {
                error!("Thumbnail creation failed for {}: {}", source.display(), e);
                ThumbnailStatus::Failed
            }
        };

        let variants: Vec<VariantOutcome> = VariantKey::ALL
            .iter()
            .map(|key| self.generate_variant(asset, info.width, &stem, *key))
            .collect();

        let record = MetadataRecord::from_info(source, Some(&info));
        let sidecar_written = match write_sidecar(self.layout, &stem, &record) {
            Ok(_) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        };

        let report = AssetReport {
            source: source.to_path_buf(),
            skipped: None,
            variants,
            thumbnail: Some(thumbnail),
            sidecar_written,
        };

        info!(
            "VR content processing completed: {} - {}/{} variants ({:.1}%)",
            source.display(),
            report.success_count(),
            VARIANT_COUNT,
            report.success_ratio() * 100.0
        );

        report
    }

    fn generate_variant(
        &self,
        asset: &SourceAsset,
        source_width: u32,
        stem: &str,
        key: VariantKey,
    ) -> VariantOutcome {
        let target = self.layout.variant_path(stem, key);

        if is_newer_than(&target, asset.modified) {
            debug!("Skipping up-to-date variant: {}", target.display());
            return VariantOutcome {
                key,
                path: target,
                status: VariantStatus::Fresh,
            };
        }

        let profile = self.config.qualities.profile(key.tier);
        let staging = staging_path(&target);
        let request = EncodeRequest {
            source: asset.path.clone(),
            target: staging.clone(),
            key,
            quality: profile.quality,
            width: target_width(source_width, profile.max_width),
            timeout: self.config.variant_timeout,
        };

        let result = self
            .backend
            .encode(&request)
            .and_then(|_| publish(&staging, &target, MIN_OUTPUT_BYTES));

        let status = match result {
            Ok(bytes) => {
                info!(
                    "Optimized {} -> {} ({}) - {:.1}% reduction",
                    asset.path.display(),
                    target.display(),
                    key,
                    reduction_percent(asset.size, bytes)
                );
                VariantStatus::Encoded { bytes }
            }
            Err(e) => {
                let _ = fs::remove_file(&staging);
                error!("Optimization failed for {} ({}): {}", asset.path.display(), key, e);
                VariantStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        VariantOutcome {
            key,
            path: target,
            status,
        }
    }
}

/// Hidden sibling of `target` that keeps its extension so encoders pick the right format
pub(crate) fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = match name.rsplit_once('.') {
        Some((stem, ext)) => format!(".{}.partial.{}", stem, ext),
        None => format!(".{}.partial", name),
    };
    target.with_file_name(staged)
}

/// Validate a staged output and move it over `target`. Returns the output size.
pub(crate) fn publish(staging: &Path, target: &Path, min_bytes: u64) -> Result<u64, EncodeError> {
    let size = fs::metadata(staging).map(|m| m.len()).unwrap_or(0);
    if size <= min_bytes {
        return Err(EncodeError::InvalidOutput {
            path: target.to_path_buf(),
            size,
        });
    }
    fs::rename(staging, target).map_err(|source| EncodeError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    Ok(size)
}

/// Size saved relative to the source, in percent (negative when the output grew)
pub fn reduction_percent(source_bytes: u64, output_bytes: u64) -> f64 {
    if source_bytes == 0 {
        return 0.0;
    }
    (1.0 - output_bytes as f64 / source_bytes as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::mock::{MockBackend, RecordedOp};
    use crate::core::variants::{OutputFormat, QualityTier};
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        layout: CacheLayout,
        asset: SourceAsset,
    }

    fn fixture(name: &str) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path().join("cache"));
        layout.ensure_dirs().unwrap();

        let path = temp_dir.path().join(name);
        fs::write(&path, vec![7u8; 50_000]).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(60);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();

        Fixture {
            _temp_dir: temp_dir,
            layout,
            asset: SourceAsset {
                path,
                size: 50_000,
                modified,
            },
        }
    }

    #[test]
    fn panorama_gets_full_matrix() {
        let fx = fixture("pano.jpg");
        let backend = MockBackend::new().with_image("pano.jpg", 8192, 4096);
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.success_count(), 9);
        assert_eq!(report.encoded_count(), 9);
        assert_eq!(report.thumbnail, Some(ThumbnailStatus::Created));
        assert!(report.sidecar_written);
        for key in VariantKey::ALL {
            assert!(fx.layout.variant_path("pano", key).exists(), "missing {}", key);
        }
        assert!(fx.layout.metadata_path("pano").exists());
    }

    #[test]
    fn encodes_with_tier_quality_and_width() {
        let fx = fixture("pano.jpg");
        let backend = MockBackend::new().with_image("pano.jpg", 3000, 1500);
        let config = GeneratorConfig::default();

        VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        let encodes: Vec<_> = backend
            .operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Encode {
                    key, quality, width, ..
                } => Some((key, quality, width)),
                _ => None,
            })
            .collect();

        assert_eq!(encodes.len(), 9);
        for (key, quality, width) in encodes {
            match key.tier {
                // Source is narrower than the high bound: no upscale
                QualityTier::High => assert_eq!((quality, width), (90, 3000)),
                QualityTier::Medium => assert_eq!((quality, width), (80, 2048)),
                QualityTier::Low => assert_eq!((quality, width), (70, 1024)),
            }
        }
    }

    #[test]
    fn single_key_failure_is_isolated() {
        let fx = fixture("pano.jpg");
        let failing = VariantKey::new(QualityTier::High, OutputFormat::Avif);
        let backend = MockBackend::new()
            .with_image("pano.jpg", 4096, 2048)
            .failing(failing);
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.success_count(), 8);
        assert!((report.success_ratio() - 8.0 / 9.0).abs() < f64::EPSILON);
        assert!(report.is_success());
        assert!(!fx.layout.variant_path("pano", failing).exists());
        let failed: Vec<_> = report.variants.iter().filter(|v| !v.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key, failing);
    }

    #[test]
    fn truncated_outputs_are_rejected() {
        let fx = fixture("pano.jpg");
        let backend = MockBackend::new()
            .with_image("pano.jpg", 4096, 2048)
            .output_size(MIN_OUTPUT_BYTES as usize);
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.success_count(), 0);
        assert!(!report.is_success());
        for key in VariantKey::ALL {
            assert!(!fx.layout.variant_path("pano", key).exists());
        }
        let leftovers = fs::read_dir(fx.layout.tier_dir(QualityTier::High))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn second_pass_reuses_fresh_variants() {
        let fx = fixture("pano.jpg");
        let backend = MockBackend::new().with_image("pano.jpg", 4096, 2048);
        let config = GeneratorConfig::default();
        let generator = VariantGenerator::new(&backend, &fx.layout, &config);

        generator.process(&fx.asset);
        let encodes_after_first = backend.encode_count();
        let second = generator.process(&fx.asset);

        assert_eq!(encodes_after_first, 9);
        assert_eq!(backend.encode_count(), 9);
        assert_eq!(second.fresh_count(), 9);
        assert_eq!(second.thumbnail, Some(ThumbnailStatus::Fresh));
    }

    #[test]
    fn non_panoramic_asset_is_skipped() {
        let fx = fixture("flat.jpg");
        let backend = MockBackend::new().with_image("flat.jpg", 1920, 1200);
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.skipped, Some(SkipReason::NotPanoramic));
        assert_eq!(backend.encode_count(), 0);
        assert!(!fx.layout.metadata_path("flat").exists());
    }

    #[test]
    fn unreadable_asset_is_skipped() {
        let fx = fixture("corrupt.jpg");
        let backend = MockBackend::new();
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.skipped, Some(SkipReason::Unreadable));
        assert!(!report.is_success());
    }

    #[test]
    fn thumbnail_failure_does_not_block_variants() {
        let fx = fixture("pano.jpg");
        let backend = MockBackend::new()
            .with_image("pano.jpg", 4096, 2048)
            .failing_thumbnails();
        let config = GeneratorConfig::default();

        let report = VariantGenerator::new(&backend, &fx.layout, &config).process(&fx.asset);

        assert_eq!(report.thumbnail, Some(ThumbnailStatus::Failed));
        assert_eq!(report.success_count(), 9);
    }

    #[test]
    fn staging_keeps_extension_and_hides_file() {
        assert_eq!(
            staging_path(Path::new("/cache/hq/pano.avif")),
            PathBuf::from("/cache/hq/.pano.partial.avif")
        );
    }

    #[test]
    fn reduction_is_relative_to_source() {
        assert_eq!(reduction_percent(1000, 250), 75.0);
        assert_eq!(reduction_percent(0, 250), 0.0);
        assert!(reduction_percent(100, 200) < 0.0);
    }
}
