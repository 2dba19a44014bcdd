use std::mem;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Finished handles are joined once this many accumulate
const REAP_THRESHOLD: usize = 256;

/// How [`ConcurrencyController::dispatch`] ran a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// On a newly spawned worker thread
    Spawned,
    /// Synchronously, on the calling thread
    Inline,
}

#[derive(Debug)]
struct BudgetState {
    /// Workers allowed besides the thread that started the search
    spawn_limit: usize,
    active: AtomicUsize,
    peak: AtomicUsize,
    spawned: AtomicU64,
    inline: AtomicU64,
    idle_lock: Mutex<()>,
    idle: Condvar,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BudgetState {
    fn try_acquire(&self) -> bool {
        match self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < self.spawn_limit).then_some(active + 1)
            }) {
            Ok(previous) => {
                self.peak.fetch_max(previous + 1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    fn release(&self) {
        // Decrement under the lock so wait_idle cannot miss the transition to zero
        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_all();
        }
    }
}

/// Holds one unit of the worker budget; gives it back when dropped, including on panic.
struct WorkerSlot(Arc<BudgetState>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Admission control over a bounded worker budget.
///
/// Each dispatched task either gets a fresh thread or, when the budget is used up,
/// runs inline on the caller. There is no queue and no thread reuse. The thread
/// that starts the search counts against the budget, so `max_workers = 1` walks
/// everything sequentially and `max_workers = N` never has more than `N` threads
/// walking at once.
///
/// Clones share the same budget.
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    state: Arc<BudgetState>,
}

impl ConcurrencyController {
    pub fn new(max_workers: NonZeroUsize) -> Self {
        Self {
            state: Arc::new(BudgetState {
                spawn_limit: max_workers.get() - 1,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                spawned: AtomicU64::new(0),
                inline: AtomicU64::new(0),
                idle_lock: Mutex::new(()),
                idle: Condvar::new(),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Total threads allowed to walk at once, including the calling thread
    pub fn max_workers(&self) -> usize {
        self.state.spawn_limit + 1
    }

    /// Spawned workers that have not finished yet
    pub fn active_workers(&self) -> usize {
        self.state.active.load(Ordering::Acquire)
    }

    pub fn workers_spawned(&self) -> u64 {
        self.state.spawned.load(Ordering::Relaxed)
    }

    pub fn inline_runs(&self) -> u64 {
        self.state.inline.load(Ordering::Relaxed)
    }

    pub fn peak_workers(&self) -> u64 {
        self.state.peak.load(Ordering::Relaxed) as u64
    }

    /// Runs `task` on a new worker if the budget allows, otherwise inline.
    pub fn dispatch<F>(&self, task: F) -> Dispatch
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.state.try_acquire() {
            self.state.inline.fetch_add(1, Ordering::Relaxed);
            task();
            return Dispatch::Inline;
        }

        let slot = WorkerSlot(Arc::clone(&self.state));
        let pending = Arc::new(Mutex::new(Some(task)));
        let handoff = Arc::clone(&pending);
        let id = self.state.spawned.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("qfs-worker-{id}"))
            .spawn(move || {
                let _slot = slot;
                if let Some(task) = take_task(&handoff) {
                    task();
                }
            });

        match spawned {
            Ok(handle) => {
                debug!("Spawned worker {} ({} active)", id, self.active_workers());
                self.track(handle);
                Dispatch::Spawned
            }
            Err(e) => {
                // The rejected closure has been dropped, which already released the slot
                warn!("Failed to spawn worker thread, running inline: {}", e);
                self.state.spawned.fetch_sub(1, Ordering::Relaxed);
                self.state.inline.fetch_add(1, Ordering::Relaxed);
                if let Some(task) = take_task(&pending) {
                    task();
                }
                Dispatch::Inline
            }
        }
    }

    /// Blocks until every spawned worker has finished, then joins them.
    ///
    /// Call once, after the root-level walk has returned on this thread.
    pub fn wait_idle(&self) {
        let mut guard = self.state.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.state.active.load(Ordering::Acquire) != 0 {
            guard = self
                .state
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(guard);

        let handles = mem::take(&mut *self.state.handles.lock().unwrap_or_else(PoisonError::into_inner));
        handles.into_iter().for_each(join_worker);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let finished = {
            let mut handles = self.state.handles.lock().unwrap_or_else(PoisonError::into_inner);
            handles.push(handle);
            if handles.len() < REAP_THRESHOLD {
                return;
            }
            let (finished, running): (Vec<_>, Vec<_>) =
                handles.drain(..).partition(JoinHandle::is_finished);
            *handles = running;
            finished
        };
        finished.into_iter().for_each(join_worker);
    }
}

fn take_task<F>(slot: &Mutex<Option<F>>) -> Option<F> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn join_worker(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("qfs-worker").to_string();
    if handle.join().is_err() {
        warn!("Worker {} panicked; its subtree is incomplete", name);
    }
}
