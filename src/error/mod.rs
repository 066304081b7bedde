//! # Error Module
//!
//! Error types for the VR content optimizer.
//!
//! ## Design Principles
//! - **Never abort a cycle** for one bad asset - errors are per asset or per variant
//! - **Include context** - paths, tool names, what went wrong
//! - **Only configuration is fatal** - everything else is logged and retried next cycle

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Introspection error: {0}")]
    Introspect(#[from] IntrospectError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to install signal handler: {0}")]
    Signal(String),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Errors that occur while enumerating source images
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading image dimensions or format
#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported or corrupt image {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Image has zero dimensions: {path}")]
    EmptyImage { path: PathBuf },
}

/// Errors from an external encoder invocation
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {:?}", timeout)]
    Timeout { tool: String, timeout: Duration },

    #[error("Output {path} is missing or too small ({size} bytes)")]
    InvalidOutput { path: PathBuf, size: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EncodeError {
    /// Whether the encoder was killed for exceeding its time budget
    pub fn is_timeout(&self) -> bool {
        matches!(self, EncodeError::Timeout { .. })
    }
}

/// Errors touching the derived cache tree
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write sidecar {path}: {reason}")]
    WriteSidecar { path: PathBuf, reason: String },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid startup configuration. The only fatal class of error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid base quality {value} (must be 1-100)")]
    InvalidQuality { value: u8 },

    #[error("Quality table is not strictly decreasing for base quality {base}")]
    QualityTable { base: u8 },

    #[error("Worker pool size must be at least 1")]
    NoWorkers,

    #[error("Interval {name} must be greater than zero")]
    ZeroInterval { name: &'static str },

    #[error("Cache retention of {days} days is too large")]
    RetentionOverflow { days: u64 },

    #[error("Cache root {path} cannot be created: {reason}")]
    CacheRoot { path: PathBuf, reason: String },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OptimizerError>;
