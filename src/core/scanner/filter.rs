//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Which extensions count as candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionSet {
    /// Raw uploads awaiting optimization
    #[default]
    Source,
    /// Trees that already hold optimized output
    Optimized,
}

impl ExtensionSet {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ExtensionSet::Source => &["jpg", "jpeg", "png", "tiff", "bmp"],
            ExtensionSet::Optimized => &["jpg", "png", "webp", "avif"],
        }
    }
}

/// Filters files to determine if they are candidate images
pub struct ImageFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ImageFilter {
    pub fn new(set: ExtensionSet) -> Self {
        Self {
            extensions: set.extensions().iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new(ExtensionSet::Source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_set_includes_raw_formats() {
        let filter = ImageFilter::new(ExtensionSet::Source);
        assert!(filter.should_include(Path::new("/vr/lobby.jpg")));
        assert!(filter.should_include(Path::new("/vr/lobby.JPEG")));
        assert!(filter.should_include(Path::new("/vr/scan.tiff")));
        assert!(filter.should_include(Path::new("/vr/scan.bmp")));
        assert!(!filter.should_include(Path::new("/vr/lobby.webp")));
    }

    #[test]
    fn optimized_set_includes_derived_formats() {
        let filter = ImageFilter::new(ExtensionSet::Optimized);
        assert!(filter.should_include(Path::new("/cache/hq/lobby.webp")));
        assert!(filter.should_include(Path::new("/cache/hq/lobby.avif")));
        assert!(!filter.should_include(Path::new("/cache/hq/lobby.tiff")));
    }

    #[test]
    fn filter_excludes_non_images() {
        let filter = ImageFilter::default();
        assert!(!filter.should_include(Path::new("/vr/notes.txt")));
        assert!(!filter.should_include(Path::new("/vr/no_extension")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        let filter = ImageFilter::default();
        assert!(!filter.should_include(Path::new("/vr/.partial.jpg")));
        assert!(filter.with_hidden(true).should_include(Path::new("/vr/.partial.jpg")));
    }
}
