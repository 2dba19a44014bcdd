mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use qfs::{ConfigOverrides, Coordinator, Match, OutputFormat, Query, SearchConfig, SearchOutput};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const BANNER_RULE: &str = "=================================================";

#[derive(Parser)]
#[command(author, version, about = "Quick File Search: find files by name in parallel", long_about = None)]
struct Cli {
    /// File name to search for: `text`, `a&&b`, `a||b` or `/regex/` (case insensitive)
    #[arg(short, long)]
    target: Option<String>,

    /// Number of threads to use (1 to the number of logical cores, default: all)
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Starting directory, or `here` for the current directory (default: system root)
    #[arg(short, long)]
    dir: Option<String>,

    /// Save the results to a file
    #[arg(short, long)]
    save: bool,

    /// File to save results to (default: founded.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Format of the saved results
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Do not print results while searching
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl Cli {
    /// Only the flags that were actually given; everything else comes from config files
    fn to_overrides(&self) -> Result<ConfigOverrides> {
        Ok(ConfigOverrides {
            pattern: self.target.clone(),
            root_path: self.dir.as_deref().map(resolve_dir).transpose()?,
            max_workers: self.threads,
            print_during_search: self.quiet.then_some(false),
            save_results: self.save.then_some(true),
            output_path: self.output.clone(),
            output_format: self.format.map(Into::into),
            log_level: self.log_level.clone(),
        })
    }
}

/// `here` means the current working directory
pub(crate) fn resolve_dir(arg: &str) -> Result<PathBuf> {
    if arg == "here" {
        std::env::current_dir().context("Cannot determine the current directory")
    } else {
        Ok(PathBuf::from(arg))
    }
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let interactive = std::env::args_os().len() == 1;

    let config = if interactive {
        let prompted = prompt::prompt_config(&mut io::stdin().lock(), &mut io::stdout())?;
        SearchConfig::load()
            .context("Failed to load configuration")?
            .merge_with_cli(prompted)
    } else {
        let cli = Cli::parse();
        SearchConfig::load_from(cli.config.as_deref())
            .context("Failed to load configuration")?
            .merge_with_cli(cli.to_overrides()?)
    };

    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);
    config.validate()?;
    let query = Query::parse(&config.pattern)?;

    let output = execute(&config, &query)?;
    report(&config, &output)?;

    if interactive {
        prompt::wait_for_enter(&mut io::stdin().lock(), &mut io::stdout())?;
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded; keep the existing one
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn execute(config: &SearchConfig, query: &Query) -> Result<SearchOutput> {
    println!(
        "\nStarting search for '{}' using {} threads...",
        config.pattern.bold(),
        config.max_workers
    );
    println!("Starting from directory: {}", config.root_path.display());
    if config.save_results {
        println!("Results will be saved to '{}'", config.output_path.display());
        if config.print_during_search {
            println!("Results will be printed during search");
        } else {
            println!("Results will NOT be printed during search");
        }
    }
    println!("Search in progress... Please wait.");

    let mut coordinator = Coordinator::new(config.max_workers);
    let spinner = if config.print_during_search {
        coordinator = coordinator.with_observer(Arc::new(|found: &Match| println!("{found}")));
        None
    } else {
        Some(start_spinner())
    };

    let result = coordinator.run(&config.root_path, query);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    Ok(result?)
}

fn start_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Searching...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn report(config: &SearchConfig, output: &SearchOutput) -> Result<()> {
    if output.is_empty() {
        println!("Nothing found");
    } else {
        let millis = u64::try_from(output.elapsed.as_millis()).unwrap_or(u64::MAX);
        let elapsed = Duration::from_millis(millis);

        if config.save_results {
            println!("\nSaving...");
            save_results(output, &config.output_path, config.output_format)?;
        }

        println!("\n{}", BANNER_RULE);
        println!(
            " {} Found {} results in {}",
            "Search complete!".green().bold(),
            output.matches.len(),
            humantime::format_duration(elapsed)
        );
        if config.save_results {
            println!(" Results saved to '{}'", config.output_path.display());
        }
        println!("{}", BANNER_RULE);
    }

    if !output.faults.is_empty() {
        println!(
            "{}",
            format!("Skipped {} unreadable paths", output.faults.len()).yellow()
        );
    }
    Ok(())
}

fn save_results(output: &SearchOutput, path: &Path, format: OutputFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create results file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Text => {
            for line in output.lines() {
                writeln!(writer, "{line}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &output.matches)?;
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}
