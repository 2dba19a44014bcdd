//! qfs - Quick File Search
//!
//! Finds files whose names satisfy a query, walking the directory tree with a
//! bounded, self-throttling number of threads.
//!
//! ```rust,no_run
//! use qfs::{Coordinator, Query};
//! use std::num::NonZeroUsize;
//! use std::path::Path;
//!
//! let query = Query::parse("invoice&&2024").unwrap();
//! let output = Coordinator::new(NonZeroUsize::new(4).unwrap())
//!     .run(Path::new("/home"), &query)
//!     .unwrap();
//! for found in &output.matches {
//!     println!("{found}");
//! }
//! ```
pub mod config;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{ConfigOverrides, OutputFormat, SearchConfig};
pub use errors::{PatternError, SearchError, SearchResult};
pub use metrics::WalkStats;
pub use results::{FaultKind, Match, MatchObserver, ResultAggregator, SearchOutput, WalkFault};
pub use search::{run, search, Combinator, Coordinator, PatternKind, Query};
