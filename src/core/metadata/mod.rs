//! # Metadata Module
//!
//! Builds the JSON sidecar written next to each source's variants.
//!
//! ## Sidecar Fields
//! - Dimensions, container format and colorspace from introspection
//! - Byte size and a whole-file content hash (xxh3-128, hex)
//! - Panoramic flag, rounded aspect ratio and projection type
//! - Generation timestamp (unix seconds)
//!
//! The sidecar is replaced wholesale on every pass, never merged. When
//! introspection fails the image-derived fields are omitted.

mod hash;

pub use hash::content_hash;

use crate::core::classifier::{Classification, ProjectionType};
use crate::core::encoder::{ImageBackend, ImageInfo};
use crate::core::variants::CacheLayout;
use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// Contents of `<cache_root>/<stem>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub format: Option<String>,
    /// Source size in bytes
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub colorspace: Option<String>,
    pub is_vr_content: bool,
    /// Width / height rounded to two decimals
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub projection_type: Option<ProjectionType>,
    /// Hex content hash; empty if the file could not be read
    pub file_hash: String,
    /// Unix seconds when the record was built
    pub optimization_timestamp: i64,
}

impl MetadataRecord {
    /// Assemble a record from already-introspected properties.
    ///
    /// `info = None` yields the partial record used when introspection failed.
    pub fn from_info(path: &Path, info: Option<&ImageInfo>) -> Self {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let file_hash = content_hash(path).unwrap_or_else(|e| {
            error!("Failed to hash file {}: {}", path.display(), e);
            String::new()
        });
        let classification =
            info.and_then(|i| Classification::from_dimensions(i.width, i.height));

        Self {
            width: info.map(|i| i.width),
            height: info.map(|i| i.height),
            format: info.map(|i| i.format.clone()),
            size,
            colorspace: info.map(|i| i.colorspace.clone()),
            is_vr_content: classification.map(|c| c.is_panoramic()).unwrap_or(false),
            aspect_ratio: classification.map(|c| round_ratio(c.aspect_ratio)),
            projection_type: classification.map(|c| c.projection()),
            file_hash,
            optimization_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// True when introspection data is missing
    pub fn is_partial(&self) -> bool {
        self.width.is_none() || self.height.is_none()
    }
}

/// Introspect `path` and build its record. Introspection failure is logged
/// and produces a partial record rather than an error.
pub fn build_metadata(backend: &dyn ImageBackend, path: &Path) -> MetadataRecord {
    match backend.introspect(path) {
        Ok(info) => MetadataRecord::from_info(path, Some(&info)),
        Err(e) => {
            error!("Metadata generation failed for {}: {}", path.display(), e);
            MetadataRecord::from_info(path, None)
        }
    }
}

/// Replace the sidecar for `stem`; readers never see a half-written file
pub fn write_sidecar(
    layout: &CacheLayout,
    stem: &str,
    record: &MetadataRecord,
) -> Result<PathBuf, CacheError> {
    let path = layout.metadata_path(stem);
    let staging = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(record).map_err(|e| CacheError::WriteSidecar {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    fs::write(&staging, json)
        .and_then(|_| fs::rename(&staging, &path))
        .map_err(|e| {
            let _ = fs::remove_file(&staging);
            CacheError::WriteSidecar {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

    Ok(path)
}

/// Load a sidecar written by [`write_sidecar`]
pub fn read_sidecar(path: &Path) -> Result<MetadataRecord, CacheError> {
    let contents = fs::read_to_string(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|e| CacheError::Read {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

fn round_ratio(ratio: f64) -> f64 {
    (ratio * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::mock::MockBackend;
    use tempfile::TempDir;

    fn source(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn full_record_describes_panorama() {
        let temp_dir = TempDir::new().unwrap();
        let path = source(&temp_dir, "pano.jpg", b"panorama bytes");
        let backend = MockBackend::new().with_image("pano.jpg", 1920, 1000);

        let record = build_metadata(&backend, &path);

        assert_eq!(record.width, Some(1920));
        assert_eq!(record.height, Some(1000));
        assert_eq!(record.size, 14);
        assert!(record.is_vr_content);
        assert_eq!(record.aspect_ratio, Some(1.92));
        assert_eq!(record.projection_type, Some(ProjectionType::Equirectangular));
        assert_eq!(record.file_hash.len(), 32);
        assert!(!record.is_partial());
    }

    #[test]
    fn introspection_failure_gives_partial_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = source(&temp_dir, "corrupt.jpg", b"junk");
        let backend = MockBackend::new();

        let record = build_metadata(&backend, &path);

        assert!(record.is_partial());
        assert!(!record.is_vr_content);
        assert_eq!(record.size, 4);
        assert!(!record.file_hash.is_empty());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("width").is_none());
        assert!(json.get("file_hash").is_some());
    }

    #[test]
    fn sidecar_uses_stable_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = source(&temp_dir, "pano.jpg", b"x");
        let info = ImageInfo {
            width: 4096,
            height: 2048,
            format: "JPEG".to_string(),
            colorspace: "sRGB".to_string(),
        };
        let record = MetadataRecord::from_info(&path, Some(&info));

        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "width",
            "height",
            "format",
            "size",
            "colorspace",
            "is_vr_content",
            "aspect_ratio",
            "projection_type",
            "file_hash",
            "optimization_timestamp",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["projection_type"], "equirectangular");
    }

    #[test]
    fn sidecar_is_overwritten_not_merged() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path());
        let path = source(&temp_dir, "pano.jpg", b"x");
        let info = ImageInfo {
            width: 4096,
            height: 2048,
            format: "JPEG".to_string(),
            colorspace: "sRGB".to_string(),
        };

        write_sidecar(&layout, "pano", &MetadataRecord::from_info(&path, Some(&info))).unwrap();
        let written = write_sidecar(&layout, "pano", &MetadataRecord::from_info(&path, None)).unwrap();

        let reloaded = read_sidecar(&written).unwrap();
        assert!(reloaded.is_partial());
        assert!(!temp_dir.path().join("pano.json.tmp").exists());
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(round_ratio(2.0), 2.0);
        assert_eq!(round_ratio(1920.0 / 1000.0), 1.92);
        assert_eq!(round_ratio(2048.0 / 1025.0), 2.0);
    }
}
