//! # Scanner Module
//!
//! Discovers candidate source images under the source root.
//!
//! ## Extension Sets
//! - `Source` - raw uploads: JPEG, PNG, TIFF, BMP
//! - `Optimized` - re-scanning derived trees: JPEG, PNG, WebP, AVIF
//!
//! ## Example
//! ```rust,ignore
//! use vr_optimizer::core::scanner::{ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! for asset in scanner.iter(Path::new("/usr/share/nginx/html/vr"))? {
//!     println!("{}", asset?.path.display());
//! }
//! ```

mod filter;
mod walker;

pub use filter::{ExtensionSet, ImageFilter};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A candidate source image. Read-only from the pipeline's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAsset {
    /// Absolute path under the source root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
}

/// Result of a collected scan
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Successfully discovered assets
    pub assets: Vec<SourceAsset>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}
