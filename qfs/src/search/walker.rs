use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use super::controller::ConcurrencyController;
use super::query::Query;
use crate::metrics::WalkMetrics;
use crate::results::{FaultKind, Match, ResultAggregator, WalkFault};

/// State shared by every worker of one search run
pub struct WalkContext {
    query: Query,
    controller: ConcurrencyController,
    aggregator: ResultAggregator,
    metrics: WalkMetrics,
}

impl WalkContext {
    pub fn new(query: Query, controller: ConcurrencyController, aggregator: ResultAggregator) -> Self {
        Self {
            query,
            controller,
            aggregator,
            metrics: WalkMetrics::new(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn controller(&self) -> &ConcurrencyController {
        &self.controller
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    pub fn metrics(&self) -> &WalkMetrics {
        &self.metrics
    }
}

enum EntryKind {
    Directory,
    File,
    Other,
}

/// Walks `dir`: matches its files and hands each subdirectory to the controller.
///
/// Paths that are missing or not directories are skipped silently. A directory that
/// cannot be listed is recorded as a fault and contributes nothing; an entry that
/// cannot be read is recorded and skipped. Neither stops the rest of the walk.
pub fn walk(ctx: &Arc<WalkContext>, dir: &Path) {
    if !dir.is_dir() {
        trace!("Not a directory, skipping: {}", dir.display());
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", dir.display(), e);
            ctx.metrics.record_directory_fault();
            ctx.aggregator
                .record_fault(WalkFault::new(dir, FaultKind::ListDirectory, &e));
            return;
        }
    };
    ctx.metrics.record_directory();

    // Collected first so the directory handle is closed before any inline recursion
    let mut subdirectories: Vec<PathBuf> = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                record_entry_fault(ctx, dir, &e);
                continue;
            }
        };

        match classify(&entry) {
            Ok(EntryKind::Directory) => subdirectories.push(entry.path()),
            Ok(EntryKind::File) => visit_file(ctx, &entry),
            Ok(EntryKind::Other) => {}
            Err(e) => record_entry_fault(ctx, &entry.path(), &e),
        }
    }

    for subdirectory in subdirectories {
        let child = Arc::clone(ctx);
        ctx.controller
            .dispatch(move || walk(&child, &subdirectory));
    }
}

fn visit_file(ctx: &WalkContext, entry: &DirEntry) {
    ctx.metrics.record_file();
    let file_name = entry.file_name();
    let name = file_name.to_string_lossy();
    if ctx.query.matches(&name) {
        ctx.metrics.record_match();
        ctx.aggregator.add(Match::new(name.into_owned(), entry.path()));
    }
}

/// Symlinked directories are not descended; symlinked files count as files.
fn classify(entry: &DirEntry) -> io::Result<EntryKind> {
    let file_type = entry.file_type()?;
    if file_type.is_dir() {
        Ok(EntryKind::Directory)
    } else if file_type.is_file() {
        Ok(EntryKind::File)
    } else if file_type.is_symlink() {
        match fs::metadata(entry.path()) {
            Ok(target) if target.is_file() => Ok(EntryKind::File),
            _ => Ok(EntryKind::Other),
        }
    } else {
        Ok(EntryKind::Other)
    }
}

fn record_entry_fault(ctx: &WalkContext, path: &Path, err: &io::Error) {
    debug!("Skipping entry {}: {}", path.display(), err);
    ctx.metrics.record_entry_fault();
    ctx.aggregator
        .record_fault(WalkFault::new(path, FaultKind::ReadEntry, err));
}
