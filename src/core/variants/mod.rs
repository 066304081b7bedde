//! # Variants Module
//!
//! The quality × format matrix every panoramic source is expanded into.
//!
//! ## Matrix
//! | Tier   | Dir  | Quality (base 85) | Max width |
//! |--------|------|-------------------|-----------|
//! | High   | `hq` | 90                | 4096      |
//! | Medium | `mq` | 80                | 2048      |
//! | Low    | `lq` | 70                | 1024      |
//!
//! Each tier is encoded to WebP, AVIF and JPEG, giving nine [`VariantKey`]s,
//! plus one thumbnail outside the matrix.

mod layout;

pub use layout::{source_stem, CacheLayout, THUMBNAIL_DIR};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of variant files a fully optimized source has
pub const VARIANT_COUNT: usize = QualityTier::ALL.len() * OutputFormat::ALL.len();

/// Quality tier of a derived variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    /// All tiers, highest first
    pub const ALL: [QualityTier; 3] = [QualityTier::High, QualityTier::Medium, QualityTier::Low];

    /// Directory name under the cache root
    pub fn dir_name(&self) -> &'static str {
        match self {
            QualityTier::High => "hq",
            QualityTier::Medium => "mq",
            QualityTier::Low => "lq",
        }
    }

    /// Maximum output width in pixels
    pub fn max_width(&self) -> u32 {
        match self {
            QualityTier::High => 4096,
            QualityTier::Medium => 2048,
            QualityTier::Low => 1024,
        }
    }

    /// Offset from the base quality
    fn quality_offset(&self) -> i16 {
        match self {
            QualityTier::High => 5,
            QualityTier::Medium => -5,
            QualityTier::Low => -15,
        }
    }

    fn index(&self) -> usize {
        match self {
            QualityTier::High => 0,
            QualityTier::Medium => 1,
            QualityTier::Low => 2,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Output encoding of a derived variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Webp,
    Avif,
    Jpeg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Webp, OutputFormat::Avif, OutputFormat::Jpeg];

    /// File extension used in the cache tree
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One cell of the variant matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub tier: QualityTier,
    pub format: OutputFormat,
}

impl VariantKey {
    /// The full matrix, tier-major
    pub const ALL: [VariantKey; VARIANT_COUNT] = [
        VariantKey::new(QualityTier::High, OutputFormat::Webp),
        VariantKey::new(QualityTier::High, OutputFormat::Avif),
        VariantKey::new(QualityTier::High, OutputFormat::Jpeg),
        VariantKey::new(QualityTier::Medium, OutputFormat::Webp),
        VariantKey::new(QualityTier::Medium, OutputFormat::Avif),
        VariantKey::new(QualityTier::Medium, OutputFormat::Jpeg),
        VariantKey::new(QualityTier::Low, OutputFormat::Webp),
        VariantKey::new(QualityTier::Low, OutputFormat::Avif),
        VariantKey::new(QualityTier::Low, OutputFormat::Jpeg),
    ];

    pub const fn new(tier: QualityTier, format: OutputFormat) -> Self {
        Self { tier, format }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tier, self.format)
    }
}

/// Encoder settings for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Target encoder quality (1-100)
    pub quality: u8,
    /// Maximum output width in pixels
    pub max_width: u32,
}

/// Tier → profile lookup derived from a base quality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityTable {
    profiles: [QualityProfile; 3],
}

impl QualityTable {
    /// Default base quality; yields 90/80/70
    pub const DEFAULT_BASE: u8 = 85;

    /// Build the table for `base`, rejecting tables that leave 1..=100 or
    /// stop decreasing from high to low.
    pub fn from_base(base: u8) -> Result<Self, ConfigError> {
        if base == 0 || base > 100 {
            return Err(ConfigError::InvalidQuality { value: base });
        }

        let mut profiles = [QualityProfile {
            quality: 0,
            max_width: 0,
        }; 3];
        for tier in QualityTier::ALL {
            let quality = base as i16 + tier.quality_offset();
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::QualityTable { base });
            }
            profiles[tier.index()] = QualityProfile {
                quality: quality as u8,
                max_width: tier.max_width(),
            };
        }

        let table = Self { profiles };
        if !table.is_strictly_decreasing() {
            return Err(ConfigError::QualityTable { base });
        }
        Ok(table)
    }

    /// Profile for a tier
    pub fn profile(&self, tier: QualityTier) -> QualityProfile {
        self.profiles[tier.index()]
    }

    fn is_strictly_decreasing(&self) -> bool {
        self.profiles.windows(2).all(|pair| {
            pair[0].quality > pair[1].quality && pair[0].max_width > pair[1].max_width
        })
    }
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            profiles: [
                QualityProfile {
                    quality: 90,
                    max_width: 4096,
                },
                QualityProfile {
                    quality: 80,
                    max_width: 2048,
                },
                QualityProfile {
                    quality: 70,
                    max_width: 1024,
                },
            ],
        }
    }
}

/// Output width for a source: the tier bound, never upscaled.
pub fn target_width(source_width: u32, max_width: u32) -> u32 {
    source_width.min(max_width)
}
