//! # Thumbnail Module
//!
//! One fixed-size preview per source, outside the variant matrix.
//! Resize to cover the box, then center-crop to exactly the box.

use crate::core::encoder::{ImageBackend, ThumbnailRequest, THUMBNAIL_TIMEOUT};
use crate::core::freshness::is_fresh;
use crate::core::generator::{publish, staging_path};
use crate::core::variants::CacheLayout;
use crate::error::EncodeError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Preview geometry and encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub timeout: Duration,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            width: 300,
            height: 150,
            quality: 80,
            timeout: THUMBNAIL_TIMEOUT,
        }
    }
}

/// What happened to a source's thumbnail this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Created,
    Fresh,
    Failed,
}

impl ThumbnailStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, ThumbnailStatus::Failed)
    }
}

/// Build (or reuse) the thumbnail for `source`
pub fn build_thumbnail(
    backend: &dyn ImageBackend,
    layout: &CacheLayout,
    source: &Path,
    stem: &str,
    spec: &ThumbnailSpec,
) -> Result<(PathBuf, ThumbnailStatus), EncodeError> {
    let target = layout.thumbnail_path(stem);
    if is_fresh(&target, source) {
        debug!("Skipping up-to-date thumbnail: {}", target.display());
        return Ok((target, ThumbnailStatus::Fresh));
    }

    let staging = staging_path(&target);
    let request = ThumbnailRequest {
        source: source.to_path_buf(),
        target: staging.clone(),
        width: spec.width,
        height: spec.height,
        quality: spec.quality,
        timeout: spec.timeout,
    };

    backend
        .thumbnail(&request)
        .and_then(|_| publish(&staging, &target, 0))
        .inspect_err(|_| {
            let _ = std::fs::remove_file(&staging);
        })?;

    info!("Created thumbnail: {}", target.display());
    Ok((target, ThumbnailStatus::Created))
}
