//! Directory walking implementation using walkdir.

use super::{filter::ExtensionSet, filter::ImageFilter, ScanResult, SourceAsset};
use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Which extensions count as candidates
    pub extensions: ExtensionSet,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new(config.extensions).with_hidden(config.include_hidden);
        Self { config, filter }
    }

    /// Lazily walk `root`, yielding one item per candidate image.
    ///
    /// Each call starts a fresh traversal, so files added or removed since
    /// the previous call are picked up. Order is unspecified.
    pub fn iter<'a>(
        &'a self,
        root: &Path,
    ) -> Result<impl Iterator<Item = Result<SourceAsset, ScanError>> + 'a, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let mut walker = WalkDir::new(&root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let include_hidden = self.config.include_hidden;
        let walk_root = root.clone();
        let iter = walker
            .into_iter()
            .filter_entry(move |entry| {
                include_hidden || entry.path() == walk_root || !is_hidden_dir(entry)
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_dir() || !self.filter.should_include(entry.path()) {
                        return None;
                    }
                    Some(self.to_asset(entry.into_path()))
                }
                Err(e) => Some(Err(walk_error(e))),
            });

        Ok(iter)
    }

    /// Walk `root` to completion, separating assets from non-fatal errors
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        let mut result = ScanResult::default();
        for item in self.iter(root)? {
            match item {
                Ok(asset) => result.assets.push(asset),
                Err(e) => {
                    warn!("Skipping during scan: {}", e);
                    result.errors.push(e);
                }
            }
        }
        Ok(result)
    }

    fn to_asset(&self, path: PathBuf) -> Result<SourceAsset, ScanError> {
        let stat = fs::metadata(&path).and_then(|m| Ok((m.len(), m.modified()?)));
        match stat {
            Ok((size, modified)) => Ok(SourceAsset {
                path,
                size,
                modified,
            }),
            Err(source) => Err(ScanError::ReadDirectory { path, source }),
        }
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn walk_error(e: walkdir::Error) -> ScanError {
    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
    if e.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: std::io::Error::other(e.to_string()),
        }
    }
}
