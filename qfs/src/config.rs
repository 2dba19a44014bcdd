use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Configuration for a file name search.
///
/// # Configuration Locations
///
/// Loaded from these locations, later ones overriding earlier ones:
/// 1. Global `$CONFIG_DIR/qfs/config.yaml`
/// 2. Local `.qfs.yaml` in the current directory
/// 3. A file passed explicitly (the CLI's `--config`)
///
/// # Configuration Format
///
/// ```yaml
/// # Query: substring, `a&&b`, `a||b`, or `/regex/`
/// pattern: "report&&2024"
///
/// # Directory to start from (default: filesystem root)
/// root_path: "/home/me/documents"
///
/// # Threads allowed to walk at once, 1..=logical cores (default: all cores)
/// max_workers: 4
///
/// # Print matches as they are found
/// print_during_search: true
///
/// # Write the sorted results to output_path
/// save_results: false
/// output_path: "founded.txt"
/// output_format: "text"   # or "json"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// Command-line values take precedence; see [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Raw query text
    #[serde(default)]
    pub pattern: String,

    /// Directory to start the search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Maximum number of threads walking at once
    #[serde(default = "default_max_workers")]
    pub max_workers: NonZeroUsize,

    /// Report each match while the search is still running
    #[serde(default = "default_true")]
    pub print_during_search: bool,

    /// Write the final results to `output_path`
    #[serde(default)]
    pub save_results: bool,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Settings supplied explicitly by the user; `None` leaves the loaded value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub pattern: Option<String>,
    pub root_path: Option<PathBuf>,
    pub max_workers: Option<NonZeroUsize>,
    pub print_during_search: Option<bool>,
    pub save_results: Option<bool>,
    pub output_path: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

/// File format used when saving results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `Found <name> at: <path>` line per match
    #[default]
    Text,
    /// A JSON array of match objects
    Json,
}

/// The filesystem root of the current platform
pub fn default_root_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\")
    } else {
        PathBuf::from("/")
    }
}

/// Number of logical cores, the upper bound for `max_workers`
pub fn available_workers() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_max_workers() -> NonZeroUsize {
    available_workers()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("founded.txt")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            max_workers: default_max_workers(),
            print_during_search: true,
            save_results: false,
            output_path: default_output_path(),
            output_format: OutputFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file.
    ///
    /// An explicit file that does not exist is an error; missing default files are not.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let default_files = [
            dirs::config_dir().map(|p| p.join("qfs/config.yaml")),
            Some(PathBuf::from(".qfs.yaml")),
        ];

        for path in default_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Overlays values given on the command line or answered interactively.
    ///
    /// Only fields that were actually supplied replace the file's value.
    pub fn merge_with_cli(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(pattern) = overrides.pattern {
            self.pattern = pattern;
        }
        if let Some(root_path) = overrides.root_path {
            self.root_path = root_path;
        }
        if let Some(max_workers) = overrides.max_workers {
            self.max_workers = max_workers;
        }
        if let Some(print_during_search) = overrides.print_during_search {
            self.print_during_search = print_during_search;
        }
        if let Some(save_results) = overrides.save_results {
            self.save_results = save_results;
        }
        if let Some(output_path) = overrides.output_path {
            self.output_path = output_path;
        }
        if let Some(output_format) = overrides.output_format {
            self.output_format = output_format;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Checks the settings the core cannot check for itself
    pub fn validate(&self) -> SearchResult<()> {
        if self.pattern.trim().is_empty() {
            return Err(SearchError::config_error("Target file name not specified"));
        }
        let max = available_workers().get();
        if self.max_workers.get() > max {
            return Err(SearchError::invalid_worker_count(self.max_workers.get(), max));
        }
        Ok(())
    }
}
