//! # Core Module
//!
//! The VR content optimization engine.
//!
//! ## Modules
//! - `scanner` - Discovers candidate source images
//! - `classifier` - Decides which sources are equirectangular panoramas
//! - `variants` - The 3×3 tier/format matrix and cache layout
//! - `encoder` - Image backend trait and the external-tool implementation
//! - `generator` - Brings one source's variants, thumbnail and sidecar up to date
//! - `metadata` - Sidecar records and content hashing
//! - `freshness` - mtime comparison between derived files and sources
//! - `janitor` - Age-based cache expiry
//! - `pipeline` - One parallel optimization cycle
//! - `scheduler` - The long-running optimize/cleanup loop
//! - `status` - Per-source optimization progress

pub mod classifier;
pub mod config;
pub mod encoder;
pub mod freshness;
pub mod generator;
pub mod janitor;
pub mod metadata;
pub mod pipeline;
pub mod scanner;
pub mod scheduler;
pub mod status;
pub mod thumbnail;
pub mod variants;

// Re-export commonly used types
pub use classifier::{is_panoramic_content, Classification, ProjectionType};
pub use config::OptimizerConfig;
pub use encoder::{CommandBackend, ImageBackend, ImageInfo};
pub use generator::{AssetReport, VariantStatus};
pub use janitor::{CacheJanitor, SweepReport};
pub use pipeline::{CycleReport, Optimizer};
pub use scanner::SourceAsset;
pub use scheduler::Scheduler;
pub use variants::{CacheLayout, OutputFormat, QualityTier, VariantKey};
