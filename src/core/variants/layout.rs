//! Paths inside the derived cache tree.

use super::{QualityTier, VariantKey};
use crate::error::CacheError;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding thumbnails under the cache root
pub const THUMBNAIL_DIR: &str = "thumbs";

/// Resolves cache paths for a source stem.
///
/// External readers depend on this layout, so it must stay stable:
/// `<root>/{hq,mq,lq}/<stem>.<ext>`, `<root>/thumbs/<stem>.jpg`, `<root>/<stem>.json`.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and every tier and thumbnail directory
    pub fn ensure_dirs(&self) -> Result<(), CacheError> {
        for dir in self.sweep_dirs() {
            fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn tier_dir(&self, tier: QualityTier) -> PathBuf {
        self.root.join(tier.dir_name())
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.root.join(THUMBNAIL_DIR)
    }

    /// Directories the janitor is allowed to expire files from
    pub fn sweep_dirs(&self) -> Vec<PathBuf> {
        QualityTier::ALL
            .iter()
            .map(|tier| self.tier_dir(*tier))
            .chain(std::iter::once(self.thumbnail_dir()))
            .collect()
    }

    pub fn variant_path(&self, stem: &str, key: VariantKey) -> PathBuf {
        self.tier_dir(key.tier)
            .join(format!("{}.{}", stem, key.format.extension()))
    }

    pub fn thumbnail_path(&self, stem: &str) -> PathBuf {
        self.thumbnail_dir().join(format!("{}.jpg", stem))
    }

    pub fn metadata_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.json", stem))
    }
}

/// File stem used to name every derived file of a source
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
