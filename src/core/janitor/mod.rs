//! # Janitor Module
//!
//! Expires derived files by age.
//!
//! Sweeps the three tier directories and the thumbnail directory and deletes
//! every regular file whose mtime is older than the retention window. Whether
//! the originating source still exists is not consulted. Sidecars at the cache
//! root are left alone.

use crate::core::variants::CacheLayout;
use crate::error::CacheError;
use crate::events::{null_sender, CleanupEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

/// Default age after which derived files are removed (30 days)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub removed: usize,
    pub retained: usize,
    pub failed: usize,
    pub bytes_freed: u64,
}

pub struct CacheJanitor {
    layout: CacheLayout,
    retention: Duration,
    remove: fn(&Path) -> io::Result<()>,
}

impl CacheJanitor {
    pub fn new(layout: CacheLayout, retention: Duration) -> Self {
        Self {
            layout,
            retention,
            remove: remove_file,
        }
    }

    #[cfg(test)]
    fn with_remover(mut self, remove: fn(&Path) -> io::Result<()>) -> Self {
        self.remove = remove;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now(), &null_sender())
    }

    /// Sweep using `now` as the reference time
    pub fn sweep_at(&self, now: SystemTime, events: &EventSender) -> SweepReport {
        let mut report = SweepReport::default();

        events.send(Event::Cleanup(CleanupEvent::Started {
            cache_root: self.layout.root().to_path_buf(),
        }));

        for dir in self.layout.sweep_dirs() {
            if !dir.is_dir() {
                debug!("Skipping missing cache directory: {}", dir.display());
                continue;
            }
            self.sweep_dir(&dir, now, &mut report, events);
        }

        info!(
            "Cache cleanup completed: removed {} files ({} bytes), kept {}, {} failures",
            report.removed, report.bytes_freed, report.retained, report.failed
        );
        events.send(Event::Cleanup(CleanupEvent::Completed {
            removed: report.removed,
            failed: report.failed,
        }));

        report
    }

    fn sweep_dir(
        &self,
        dir: &Path,
        now: SystemTime,
        report: &mut SweepReport,
        events: &EventSender,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                let e = CacheError::Read {
                    path: dir.to_path_buf(),
                    source,
                };
                error!("Cache cleanup failed: {}", e);
                report.failed += 1;
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    error!("Failed to stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            let modified = metadata.modified().unwrap_or(now);
            // Files stamped in the future have age zero
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                report.retained += 1;
                continue;
            }

            match (self.remove)(&path) {
                Ok(()) => {
                    debug!("Removed old cache file: {}", path.display());
                    report.removed += 1;
                    report.bytes_freed += metadata.len();
                    events.send(Event::Cleanup(CleanupEvent::Removed { path }));
                }
                Err(source) => {
                    let e = CacheError::Remove {
                        path: path.clone(),
                        source,
                    };
                    error!("{}", e);
                    report.failed += 1;
                    events.send(Event::Cleanup(CleanupEvent::Error {
                        path,
                        message: e.to_string(),
                    }));
                }
            }
        }
    }
}

fn remove_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}
