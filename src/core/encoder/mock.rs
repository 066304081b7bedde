//! Recording backend for pipeline tests. Writes dummy outputs, never runs tools.

use super::{EncodeRequest, ImageBackend, ImageInfo, ThumbnailRequest};
use crate::core::variants::VariantKey;
use crate::error::{EncodeError, IntrospectError};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// An operation the pipeline asked for
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Introspect(PathBuf),
    Encode {
        source: PathBuf,
        key: VariantKey,
        quality: u8,
        width: u32,
    },
    Thumbnail {
        source: PathBuf,
        width: u32,
        height: u32,
    },
}

pub struct MockBackend {
    /// Dimensions by file name; unknown names fail introspection
    dimensions: HashMap<String, (u32, u32)>,
    failing_keys: HashSet<VariantKey>,
    /// File names whose introspection panics
    panicking: HashSet<String>,
    fail_thumbnails: bool,
    output_size: usize,
    operations: Mutex<Vec<RecordedOp>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            dimensions: HashMap::new(),
            failing_keys: HashSet::new(),
            panicking: HashSet::new(),
            fail_thumbnails: false,
            output_size: 4096,
            operations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_image(mut self, file_name: &str, width: u32, height: u32) -> Self {
        self.dimensions
            .insert(file_name.to_string(), (width, height));
        self
    }

    pub fn failing(mut self, key: VariantKey) -> Self {
        self.failing_keys.insert(key);
        self
    }

    pub fn panicking_on(mut self, file_name: &str) -> Self {
        self.panicking.insert(file_name.to_string());
        self
    }

    pub fn failing_thumbnails(mut self) -> Self {
        self.fail_thumbnails = true;
        self
    }

    /// Size of every written output; below the validation floor simulates truncation
    pub fn output_size(mut self, size: usize) -> Self {
        self.output_size = size;
        self
    }

    pub fn operations(&self) -> Vec<RecordedOp> {
        self.operations.lock().unwrap().clone()
    }

    pub fn encode_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count()
    }

    fn record(&self, op: RecordedOp) {
        self.operations.lock().unwrap().push(op);
    }

    fn write_output(&self, target: &Path) -> Result<(), EncodeError> {
        fs::write(target, vec![0u8; self.output_size]).map_err(|source| EncodeError::Io {
            path: target.to_path_buf(),
            source,
        })
    }
}

impl ImageBackend for MockBackend {
    fn introspect(&self, path: &Path) -> Result<ImageInfo, IntrospectError> {
        self.record(RecordedOp::Introspect(path.to_path_buf()));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.panicking.contains(&name) {
            panic!("decoder crashed on {}", name);
        }

        match self.dimensions.get(&name) {
            Some(&(width, height)) => Ok(ImageInfo {
                width,
                height,
                format: "JPEG".to_string(),
                colorspace: "sRGB".to_string(),
            }),
            None => Err(IntrospectError::Unreadable {
                path: path.to_path_buf(),
                reason: "unknown test image".to_string(),
            }),
        }
    }

    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        self.record(RecordedOp::Encode {
            source: request.source.clone(),
            key: request.key,
            quality: request.quality,
            width: request.width,
        });

        if self.failing_keys.contains(&request.key) {
            return Err(EncodeError::Failed {
                tool: "mock".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("refusing {}", request.key),
            });
        }
        self.write_output(&request.target)
    }

    fn thumbnail(&self, request: &ThumbnailRequest) -> Result<(), EncodeError> {
        self.record(RecordedOp::Thumbnail {
            source: request.source.clone(),
            width: request.width,
            height: request.height,
        });

        if self.fail_thumbnails {
            return Err(EncodeError::Timeout {
                tool: "mock".to_string(),
                timeout: request.timeout,
            });
        }
        self.write_output(&request.target)
    }
}
