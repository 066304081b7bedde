//! # Encoder Module
//!
//! The boundary between the pipeline and whatever actually touches pixels.
//!
//! ## Operations
//! | Operation | [`CommandBackend`] |
//! |---|---|
//! | **Introspect** | `image` header probe, falling back to `identify` |
//! | **Encode WebP** | `cwebp -q Q -resize W 0 -metadata none -method 6` |
//! | **Encode AVIF/JPEG** | `magick -resize Wx -quality Q -strip` |
//! | **Thumbnail** | `magick -resize WxH^ -gravity center -crop WxH+0+0` |
//!
//! The pipeline only sees [`ImageBackend`], so a native codec or a remote
//! encoding service can be swapped in without touching the generator.

mod command;
#[cfg(test)]
pub(crate) mod mock;
mod process;

pub use command::{CommandBackend, ToolPaths};
pub use process::{run_with_timeout, ToolOutput};

use crate::core::variants::VariantKey;
use crate::error::{EncodeError, IntrospectError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ceiling for one variant encode
pub const VARIANT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default ceiling for one thumbnail
pub const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(60);

/// Properties read from an image header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Container format, upper case (e.g. `JPEG`, `TIFF`)
    pub format: String,
    /// Colorspace name (e.g. `sRGB`, `Gray`)
    pub colorspace: String,
}

/// One resize-and-encode job
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub key: VariantKey,
    pub quality: u8,
    /// Output width; height follows the source aspect ratio
    pub width: u32,
    pub timeout: Duration,
}

/// One center-cropped preview job
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub timeout: Duration,
}

/// Image capability the pipeline depends on
pub trait ImageBackend: Send + Sync {
    /// Read dimensions, format and colorspace
    fn introspect(&self, path: &Path) -> Result<ImageInfo, IntrospectError>;

    /// Resize to `request.width`, encode to `request.key.format`, strip metadata
    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError>;

    /// Resize to cover `width`×`height`, then center-crop to exactly that size
    fn thumbnail(&self, request: &ThumbnailRequest) -> Result<(), EncodeError>;
}
