/// Search result types and the thread-safe aggregator that collects them.
///
/// Workers append into a [`ResultAggregator`] from many threads at once. Nothing about
/// the arrival order is guaranteed; [`ResultAggregator::finalize`] imposes the only
/// order the caller ever sees, a sort over the rendered `"Found <name> at: <path>"`
/// strings. Because every rendered string embeds a distinct absolute path the sort is
/// total, so the output is identical no matter how the walk interleaved.
use rayon::slice::ParallelSliceMut;
use serde::Serialize;
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::trace;

use crate::metrics::WalkStats;

/// Result sets at least this large are sorted on the rayon pool
const PARALLEL_SORT_THRESHOLD: usize = 4096;

/// A file whose name satisfied the query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Match {
    /// The bare file name that was tested
    pub file_name: String,
    /// Absolute path to the file
    pub path: PathBuf,
}

impl Match {
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
        }
    }

    /// The canonical text form, also used as the sort key
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Found {} at: {}", self.file_name, self.path.display())
    }
}

/// Where in the walk a filesystem fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The directory itself could not be listed; its whole subtree is missing
    ListDirectory,
    /// One entry could not be read; only that entry is missing
    ReadEntry,
}

/// A filesystem fault that was contained to one directory or entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkFault {
    pub path: PathBuf,
    pub kind: FaultKind,
    pub message: String,
}

impl WalkFault {
    pub fn new(path: &Path, kind: FaultKind, err: &std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: err.to_string(),
        }
    }
}

/// Receives matches as soon as they are discovered, before the final sort.
///
/// Called from worker threads, outside of the aggregator's lock.
pub trait MatchObserver: Send + Sync {
    fn on_match(&self, found: &Match);
}

impl<F> MatchObserver for F
where
    F: Fn(&Match) + Send + Sync,
{
    fn on_match(&self, found: &Match) {
        self(found)
    }
}

/// Collects matches and faults from concurrent workers
#[derive(Default)]
pub struct ResultAggregator {
    matches: Mutex<Vec<Match>>,
    faults: Mutex<Vec<WalkFault>>,
    observer: Option<Arc<dyn MatchObserver>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn MatchObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::default()
        }
    }

    /// Appends a match. Safe to call from any number of threads.
    pub fn add(&self, found: Match) {
        trace!("{}", found);
        if let Some(observer) = &self.observer {
            observer.on_match(&found);
        }
        self.matches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(found);
    }

    pub fn record_fault(&self, fault: WalkFault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fault);
    }

    /// Number of matches collected so far
    pub fn len(&self) -> usize {
        self.matches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the collected matches, sorted by their rendered form.
    ///
    /// Must only be called once no worker can still call [`add`](Self::add).
    pub fn finalize(&self) -> Vec<Match> {
        let matches = mem::take(&mut *self.matches.lock().unwrap_or_else(PoisonError::into_inner));
        let mut keyed: Vec<(String, Match)> = matches.into_iter().map(|m| (m.render(), m)).collect();

        if keyed.len() >= PARALLEL_SORT_THRESHOLD {
            keyed.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));
        } else {
            keyed.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }

        keyed.into_iter().map(|(_, m)| m).collect()
    }

    /// Drains the recorded faults, ordered by path
    pub fn take_faults(&self) -> Vec<WalkFault> {
        let mut faults = mem::take(&mut *self.faults.lock().unwrap_or_else(PoisonError::into_inner));
        faults.sort_by(|a, b| a.path.cmp(&b.path));
        faults
    }
}

/// Everything a finished search hands back to its caller
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutput {
    /// Sorted matches
    pub matches: Vec<Match>,
    /// Subtrees or entries that could not be read
    pub faults: Vec<WalkFault>,
    /// Counters collected during the walk
    pub stats: WalkStats,
    /// Wall-clock time of the walk
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SearchOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Rendered lines in final order
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.matches.iter().map(Match::render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_match_rendering() {
        let m = Match::new("Hello.txt", "/data/a/Hello.txt");
        assert_eq!(m.render(), "Found Hello.txt at: /data/a/Hello.txt");
        assert_eq!(m.to_string(), m.render());
    }

    #[test]
    fn test_finalize_sorts_by_rendered_string() {
        let aggregator = ResultAggregator::new();
        aggregator.add(Match::new("b.txt", "/r/b.txt"));
        aggregator.add(Match::new("a.txt", "/r/z/a.txt"));
        aggregator.add(Match::new("a.txt", "/r/a.txt"));

        let sorted: Vec<String> = aggregator.finalize().iter().map(Match::render).collect();
        assert_eq!(
            sorted,
            vec![
                "Found a.txt at: /r/a.txt",
                "Found a.txt at: /r/z/a.txt",
                "Found b.txt at: /r/b.txt",
            ]
        );
        assert!(aggregator.is_empty());
    }

    #[test]
    fn test_finalize_is_independent_of_arrival_order() {
        let items: Vec<Match> = (0..50)
            .map(|i| Match::new(format!("f{i}.log"), format!("/root/d{}/f{i}.log", i % 7)))
            .collect();

        let forward = ResultAggregator::new();
        items.iter().cloned().for_each(|m| forward.add(m));

        let backward = ResultAggregator::new();
        items.iter().rev().cloned().for_each(|m| backward.add(m));

        assert_eq!(forward.finalize(), backward.finalize());
    }

    #[test]
    fn test_concurrent_adds() {
        let aggregator = Arc::new(ResultAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for i in 0..100 {
                        aggregator.add(Match::new("x", format!("/t{t}/x{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.len(), 800);
        assert_eq!(aggregator.finalize().len(), 800);
    }

    #[test]
    fn test_large_result_set_uses_same_order() {
        let aggregator = ResultAggregator::new();
        for i in (0..PARALLEL_SORT_THRESHOLD + 10).rev() {
            aggregator.add(Match::new("n", format!("/p/{i:06}")));
        }
        let result = aggregator.finalize();
        assert!(result.windows(2).all(|w| w[0].render() < w[1].render()));
    }

    #[test]
    fn test_observer_sees_every_match() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let aggregator = ResultAggregator::with_observer(Arc::new(move |_: &Match| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        aggregator.add(Match::new("one", "/one"));
        aggregator.add(Match::new("two", "/two"));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(aggregator.finalize().len(), 2);
    }

    #[test]
    fn test_faults_are_sorted_by_path() {
        let aggregator = ResultAggregator::new();
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        aggregator.record_fault(WalkFault::new(Path::new("/b"), FaultKind::ListDirectory, &err));
        aggregator.record_fault(WalkFault::new(Path::new("/a"), FaultKind::ReadEntry, &err));

        let faults = aggregator.take_faults();
        assert_eq!(faults[0].path, PathBuf::from("/a"));
        assert_eq!(faults[1].kind, FaultKind::ListDirectory);
    }
}
