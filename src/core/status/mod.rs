//! # Status Module
//!
//! Read-only view of how far the cache has caught up with the source tree.
//!
//! Counts, per source, the variants that exist and are newer than it. A source
//! is fully optimized when all nine are current. Sources are not introspected,
//! so non-panoramic images simply report zero variants.

use crate::core::freshness::is_newer_than;
use crate::core::scanner::{ExtensionSet, ScanConfig, SourceAsset, WalkDirScanner};
use crate::core::variants::{source_stem, CacheLayout, VariantKey, VARIANT_COUNT};
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub path: PathBuf,
    /// Current variants out of nine
    pub variants_count: usize,
    pub fully_optimized: bool,
    pub has_thumbnail: bool,
    pub has_metadata: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub source_root: PathBuf,
    pub cache_root: PathBuf,
    pub total_sources: usize,
    pub fully_optimized: usize,
    /// Derived image files anywhere in the tier and thumbnail directories
    pub total_cached_files: usize,
    pub sources: Vec<SourceStatus>,
}

/// Walk the source tree and compare each file against its cache entries
pub fn collect_status(source_root: &Path, layout: &CacheLayout) -> Result<StatusReport, ScanError> {
    let scanner = WalkDirScanner::new(ScanConfig::default());
    let scan = scanner.scan(source_root)?;

    let mut sources: Vec<SourceStatus> = scan
        .assets
        .iter()
        .map(|asset| source_status(asset, layout))
        .collect();
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(StatusReport {
        source_root: source_root.to_path_buf(),
        cache_root: layout.root().to_path_buf(),
        total_sources: sources.len(),
        fully_optimized: sources.iter().filter(|s| s.fully_optimized).count(),
        total_cached_files: count_cached_files(layout),
        sources,
    })
}

fn source_status(asset: &SourceAsset, layout: &CacheLayout) -> SourceStatus {
    let stem = source_stem(&asset.path);
    let variants_count = VariantKey::ALL
        .iter()
        .filter(|key| is_newer_than(&layout.variant_path(&stem, **key), asset.modified))
        .count();

    SourceStatus {
        path: asset.path.clone(),
        variants_count,
        fully_optimized: variants_count == VARIANT_COUNT,
        has_thumbnail: layout.thumbnail_path(&stem).exists(),
        has_metadata: layout.metadata_path(&stem).exists(),
    }
}

fn count_cached_files(layout: &CacheLayout) -> usize {
    let scanner = WalkDirScanner::new(ScanConfig {
        extensions: ExtensionSet::Optimized,
        ..Default::default()
    });
    layout
        .sweep_dirs()
        .iter()
        .filter_map(|dir| scanner.scan(dir).ok())
        .map(|result| result.assets.len())
        .sum()
}
