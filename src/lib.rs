//! # VR Content Optimizer
//!
//! Keeps a cache of web-ready variants for a tree of 360° panoramas.
//!
//! ## What it does
//! - Finds equirectangular panoramas (2:1, at least 1024×512) under a source root
//! - Derives WebP, AVIF and JPEG at three quality tiers, plus a thumbnail and a JSON sidecar
//! - Re-encodes only what is missing or older than its source
//! - Expires cached files past a retention window
//!
//! ## Architecture
//! - `core` - The optimization engine
//! - `events` - Progress reporting over channels
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OptimizerError, Result};

/// Initialize tracing for the binary.
///
/// Honors `RUST_LOG`; otherwise logs at `default_level`. Calling it twice is a no-op.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
