use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::controller::ConcurrencyController;
use super::query::Query;
use super::walker::{walk, WalkContext};
use crate::config::SearchConfig;
use crate::errors::{unify_path, SearchError, SearchResult};
use crate::results::{Match, MatchObserver, ResultAggregator, SearchOutput};

/// Drives one complete search: seeds the walk at the root, waits for every worker
/// to finish, then returns the sorted matches.
///
/// `max_workers` counts the calling thread, which walks the root itself: a budget
/// of `N` spawns at most `N - 1` extra threads, and a budget of 1 never spawns.
///
/// Every run gets its own budget and aggregator, so several coordinators can
/// search concurrently in one process.
#[derive(Clone)]
pub struct Coordinator {
    max_workers: NonZeroUsize,
    observer: Option<Arc<dyn MatchObserver>>,
}

impl Coordinator {
    pub fn new(max_workers: NonZeroUsize) -> Self {
        Self {
            max_workers,
            observer: None,
        }
    }

    /// Attaches an observer that sees each match as soon as it is found
    pub fn with_observer(mut self, observer: Arc<dyn MatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn max_workers(&self) -> NonZeroUsize {
        self.max_workers
    }

    pub fn run(&self, root: &Path, query: &Query) -> SearchResult<SearchOutput> {
        let root = validate_root(root)?;
        info!(
            "Starting search for {:?} in {} with {} workers",
            query.patterns(),
            root.display(),
            self.max_workers
        );
        let started = Instant::now();

        let controller = ConcurrencyController::new(self.max_workers);
        let aggregator = match &self.observer {
            Some(observer) => ResultAggregator::with_observer(Arc::clone(observer)),
            None => ResultAggregator::new(),
        };
        let ctx = Arc::new(WalkContext::new(query.clone(), controller.clone(), aggregator));

        walk(&ctx, &root);
        debug!("Root walk returned, waiting for workers");
        controller.wait_idle();

        let mut stats = ctx.metrics().get_stats();
        stats.workers_spawned = controller.workers_spawned();
        stats.inline_runs = controller.inline_runs();
        stats.peak_workers = controller.peak_workers();

        let output = SearchOutput {
            matches: ctx.aggregator().finalize(),
            faults: ctx.aggregator().take_faults(),
            stats,
            elapsed: started.elapsed(),
        };

        stats.log();
        info!(
            "Search complete. Found {} matches in {:?} ({} faults)",
            output.matches.len(),
            output.elapsed,
            output.faults.len()
        );

        Ok(output)
    }
}

/// Runs a search and returns only the sorted matches
pub fn run(root: &Path, query: &Query, max_workers: NonZeroUsize) -> SearchResult<Vec<Match>> {
    Coordinator::new(max_workers)
        .run(root, query)
        .map(|output| output.matches)
}

/// Parses the configured pattern and searches the configured root
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutput> {
    let query = Query::parse(&config.pattern)?;
    Coordinator::new(config.max_workers).run(&config.root_path, &query)
}

/// The root must exist, be a directory and be listable; anything else is fatal.
fn validate_root(root: &Path) -> SearchResult<PathBuf> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {
            fs::read_dir(root)?;
            Ok(unify_path(root))
        }
        Ok(_) => Err(SearchError::not_a_directory(root)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SearchError::root_not_found(root)),
        Err(e) => Err(SearchError::IoError(e)),
    }
}
