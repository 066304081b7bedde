//! # Classifier Module
//!
//! Decides whether an image is an equirectangular VR panorama.
//!
//! ## Rule
//! Equirectangular panoramas are 2:1. An image is accepted iff
//! `|width / height - 2.0| < 0.1` and it is at least 1024×512, which
//! filters out icons and thumbnails that happen to share the ratio.

use crate::core::encoder::ImageBackend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Target aspect ratio for equirectangular projection
pub const PANORAMIC_ASPECT: f64 = 2.0;

/// Allowed distance from [`PANORAMIC_ASPECT`] (exclusive)
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// Minimum width of a panorama in pixels
pub const MIN_WIDTH: u32 = 1024;

/// Minimum height of a panorama in pixels
pub const MIN_HEIGHT: u32 = 512;

/// Projection reported in metadata sidecars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionType {
    Equirectangular,
    Unknown,
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionType::Equirectangular => write!(f, "equirectangular"),
            ProjectionType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of classifying one image by its dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
}

impl Classification {
    /// Returns `None` for a zero height, which has no aspect ratio
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        if height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
        })
    }

    /// Aspect ratio within tolerance of 2:1
    pub fn has_panoramic_aspect(&self) -> bool {
        (self.aspect_ratio - PANORAMIC_ASPECT).abs() < ASPECT_TOLERANCE
    }

    /// Large enough to be real VR content
    pub fn meets_resolution_floor(&self) -> bool {
        self.width >= MIN_WIDTH && self.height >= MIN_HEIGHT
    }

    pub fn is_panoramic(&self) -> bool {
        self.has_panoramic_aspect() && self.meets_resolution_floor()
    }

    /// Projection is judged on aspect alone; small 2:1 images still report equirectangular
    pub fn projection(&self) -> ProjectionType {
        if self.has_panoramic_aspect() {
            ProjectionType::Equirectangular
        } else {
            ProjectionType::Unknown
        }
    }
}

/// Pure dimension check
pub fn is_panoramic(width: u32, height: u32) -> bool {
    Classification::from_dimensions(width, height)
        .map(|c| c.is_panoramic())
        .unwrap_or(false)
}

/// Introspect `path` and classify it. Unreadable images are not panoramic.
pub fn is_panoramic_content(backend: &dyn ImageBackend, path: &Path) -> bool {
    classify(backend, path)
        .map(|c| c.is_panoramic())
        .unwrap_or(false)
}

/// Introspect and classify, logging (not propagating) introspection failures
pub fn classify(backend: &dyn ImageBackend, path: &Path) -> Option<Classification> {
    match backend.introspect(path) {
        Ok(info) => Classification::from_dimensions(info.width, info.height),
        Err(e) => {
            warn!("Could not analyze image dimensions for {}: {}", path.display(), e);
            None
        }
    }
}
