//! The concurrent traversal engine.
//!
//! ```text
//! Coordinator::run
//!   └─ walk(root)                       on the calling thread
//!        ├─ file    → Query::matches → ResultAggregator::add
//!        └─ subdir  → ConcurrencyController::dispatch(walk(subdir))
//!                        ├─ budget free → new worker thread
//!                        └─ budget full → inline, on the dispatching thread
//!   └─ ConcurrencyController::wait_idle
//!   └─ ResultAggregator::finalize       sorted by rendered match
//! ```
pub mod controller;
pub mod engine;
pub mod matcher;
pub mod query;
pub mod walker;

pub use controller::{ConcurrencyController, Dispatch};
pub use engine::{run, search, Coordinator};
pub use matcher::{matches, PatternMatcher};
pub use query::{Combinator, PatternKind, Query};
pub use walker::{walk, WalkContext};
