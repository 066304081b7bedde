//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Cycle-level events
    Cycle(CycleEvent),
    /// Per-source events during the optimize phase
    Asset(AssetEvent),
    /// Cache janitor events
    Cleanup(CleanupEvent),
}

/// Events bracketing one optimization cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleEvent {
    /// Cycle has started
    Started { source_root: PathBuf },
    /// Moving to a new phase
    PhaseChanged { phase: CyclePhase },
    /// Cycle finished, with its totals
    Completed { summary: CycleSummary },
    /// Cycle could not run (e.g. missing source root)
    Failed { message: String },
}

/// Phases of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Scanning,
    Optimizing,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclePhase::Scanning => write!(f, "Scanning"),
            CyclePhase::Optimizing => write!(f, "Optimizing"),
        }
    }
}

/// Events during the optimize phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssetEvent {
    /// Candidates found by the scan
    Started { total_assets: usize },
    /// One source finished (in any state)
    Progress(AssetProgress),
    /// A single variant key failed; the rest of the asset continues
    VariantFailed {
        path: PathBuf,
        key: String,
        message: String,
    },
    /// All sources processed
    Completed { processed: usize },
}

/// Progress information during the optimize phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetProgress {
    /// Sources finished so far
    pub completed: usize,
    /// Total candidates in this cycle
    pub total: usize,
    /// Source that just finished
    pub current_path: PathBuf,
    /// Variants present and current for that source
    pub variants_ready: usize,
}

/// Events from the cache janitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CleanupEvent {
    Started { cache_root: PathBuf },
    Removed { path: PathBuf },
    Error { path: PathBuf, message: String },
    Completed { removed: usize, failed: usize },
}

/// Totals for one optimization cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Candidates found by the scan
    pub total_assets: usize,
    /// Panoramic sources with at least one variant ready
    pub processed: usize,
    /// Sources rejected by the classifier or unreadable
    pub skipped: usize,
    /// Panoramic sources with no variant ready
    pub failed: usize,
    /// Variants written this cycle
    pub variants_encoded: usize,
    /// Variants reused because they were newer than their source
    pub variants_fresh: usize,
    /// Variants that failed this cycle
    pub variants_failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Asset(AssetEvent::Progress(AssetProgress {
            completed: 3,
            total: 10,
            current_path: PathBuf::from("/vr/lobby.jpg"),
            variants_ready: 9,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Asset(AssetEvent::Progress(p)) => {
                assert_eq!(p.variants_ready, 9);
                assert_eq!(p.total, 10);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn cycle_summary_is_serializable() {
        let summary = CycleSummary {
            total_assets: 12,
            processed: 4,
            skipped: 8,
            variants_encoded: 36,
            duration_ms: 5000,
            ..Default::default()
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"variants_encoded\":36"));
    }
}
