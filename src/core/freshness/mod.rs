//! # Freshness Module
//!
//! Decides whether a derived file can be reused instead of re-encoded.
//!
//! A target is fresh iff it exists and its modification time is strictly
//! later than the source's. Touching a source without changing its content
//! therefore triggers regeneration. Clock skew between the source and cache
//! filesystems is not compensated for.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Modification time, or `None` if the file is missing or unreadable
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True iff `target` exists and is strictly newer than `source`
pub fn is_fresh(target: &Path, source: &Path) -> bool {
    modified_time(source).is_some_and(|source_mtime| is_newer_than(target, source_mtime))
}

/// Same check against a source mtime already read by the scanner
pub fn is_newer_than(target: &Path, source_mtime: SystemTime) -> bool {
    modified_time(target).is_some_and(|target_mtime| target_mtime > source_mtime)
}
