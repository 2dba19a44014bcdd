use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counts what a walk did. Cheap to clone; clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct WalkMetrics {
    directories_scanned: Arc<AtomicU64>,
    files_examined: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,
    directory_faults: Arc<AtomicU64>,
    entry_faults: Arc<AtomicU64>,
}

impl WalkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_directory(&self) {
        self.directories_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files_examined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_directory_fault(&self) {
        self.directory_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_fault(&self) {
        self.entry_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the walk counters; worker counters are filled in by the caller
    pub fn get_stats(&self) -> WalkStats {
        WalkStats {
            directories_scanned: self.directories_scanned.load(Ordering::Relaxed),
            files_examined: self.files_examined.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            directory_faults: self.directory_faults.load(Ordering::Relaxed),
            entry_faults: self.entry_faults.load(Ordering::Relaxed),
            ..WalkStats::default()
        }
    }
}

/// Statistics about one finished walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub directories_scanned: u64,
    pub files_examined: u64,
    pub matches_found: u64,
    pub directory_faults: u64,
    pub entry_faults: u64,
    /// Subdirectories handed to a freshly spawned worker
    pub workers_spawned: u64,
    /// Subdirectories walked on the dispatching thread because the budget was full
    pub inline_runs: u64,
    /// Highest number of workers that were alive at the same time
    pub peak_workers: u64,
}

impl WalkStats {
    pub fn log(&self) {
        info!(
            "Walk stats:\n\
             Directories scanned: {}\n\
             Files examined: {}\n\
             Matches: {}\n\
             Faults (directory/entry): {}/{}\n\
             Workers (spawned/inline/peak): {}/{}/{}",
            self.directories_scanned,
            self.files_examined,
            self.matches_found,
            self.directory_faults,
            self.entry_faults,
            self.workers_spawned,
            self.inline_runs,
            self.peak_workers
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = WalkMetrics::new();
        metrics.record_directory();
        metrics.record_directory();
        metrics.record_file();
        metrics.record_match();
        metrics.record_directory_fault();
        metrics.record_entry_fault();
        metrics.record_entry_fault();

        let stats = metrics.get_stats();
        assert_eq!(stats.directories_scanned, 2);
        assert_eq!(stats.files_examined, 1);
        assert_eq!(stats.matches_found, 1);
        assert_eq!(stats.directory_faults, 1);
        assert_eq!(stats.entry_faults, 2);
        assert_eq!(stats.workers_spawned, 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = WalkMetrics::new();
        let clone = metrics.clone();
        clone.record_file();
        assert_eq!(metrics.get_stats().files_examined, 1);
    }
}
