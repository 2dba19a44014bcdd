/// Error types for qfs.
///
/// Two layers exist:
///
/// 1. [`PatternError`] is produced while parsing a raw query. It is fatal to
///    starting a run: a caller holding a `PatternError` must not begin traversal.
/// 2. [`SearchError`] covers everything that can stop a run before it starts
///    (a bad query, a missing root, an invalid worker budget, a broken config).
///
/// Faults hit *during* a walk are not errors in this sense. They are recorded as
/// [`WalkFault`](crate::results::WalkFault) values and returned alongside the
/// matches, so one unreadable subtree never aborts its siblings.
///
/// ```rust,ignore
/// match Query::parse("a&&b||c") {
///     Ok(query) => // run the search,
///     Err(PatternError::AmbiguousCombinator) => // report and stop,
///     Err(e) => // other pattern problem,
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while turning raw pattern text into a [`Query`](crate::search::Query)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    EmptyPattern,
    #[error("Pattern mixes '&&' and '||'; use only one combinator per query")]
    AmbiguousCombinator,
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Errors that prevent a search from running
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("Starting directory does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("Starting path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Worker count must be between 1 and {max}, got {requested}")]
    InvalidWorkerCount { requested: usize, max: usize },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Canonicalize the path and strip UNC prefixes so that
/// rendered paths on Windows look like ordinary absolute paths.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl PatternError {
    pub fn invalid_regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl SearchError {
    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound(path.into())
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn invalid_worker_count(requested: usize, max: usize) -> Self {
        Self::InvalidWorkerCount { requested, max }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
