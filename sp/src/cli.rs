//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::{Config, ModeName};
use crate::error::EngineError;

/// savagepot - a cook, a pot and a tribe of hungry savages
#[derive(Parser)]
#[command(name = "sp", author, version, about = "Dining savages around a bounded pot", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the cook and the savages
    Run(RunArgs),

    /// Print the events of a past run
    Events {
        /// Run ID
        run_id: String,

        /// Directory holding the runs (defaults to the configured one)
        #[arg(long)]
        runs_dir: Option<PathBuf>,
    },

    /// Check the events of a past run against the pot invariants
    Audit {
        /// Run ID
        run_id: String,

        /// Pot capacity (inferred from the events when omitted)
        #[arg(long)]
        capacity: Option<usize>,

        /// Directory holding the runs (defaults to the configured one)
        #[arg(long)]
        runs_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List past runs
    Runs {
        /// Directory holding the runs (defaults to the configured one)
        #[arg(long)]
        runs_dir: Option<PathBuf>,
    },
}

/// Options of `sp run`; each one overrides the config file
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Number of savages
    #[arg(short, long)]
    pub savages: Option<usize>,

    /// Servings in a full pot
    #[arg(short = 'n', long)]
    pub capacity: Option<usize>,

    /// Every savage eats once per round before anyone eats twice
    #[arg(long)]
    pub fair: bool,

    /// How long the run lasts
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeName>,

    /// Bites per savage (implies --mode bites unless a mode is given)
    #[arg(short, long)]
    pub bites: Option<u64>,

    /// Length of a timed run in seconds
    #[arg(short, long)]
    pub duration_secs: Option<u64>,

    /// Eating time between meals in milliseconds
    #[arg(long)]
    pub eat_ms: Option<u64>,

    /// Random extra eating time in milliseconds
    #[arg(long)]
    pub jitter_ms: Option<u64>,

    /// Output format of the final report
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Do not persist events
    #[arg(long)]
    pub no_persist: bool,

    /// Do not print events as they happen
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory holding the runs (defaults to the configured one)
    #[arg(long)]
    pub runs_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Layer the command-line options over `config`
    pub fn apply(&self, config: &mut Config) {
        debug!(?self, "RunArgs::apply: called");
        if let Some(savages) = self.savages {
            config.savages.count = savages;
        }
        if let Some(capacity) = self.capacity {
            config.pot.capacity = capacity;
        }
        if self.fair {
            config.pot.fair = true;
        }
        if let Some(bites) = self.bites {
            config.run.bites = bites;
            config.run.mode = ModeName::Bites;
        }
        if let Some(mode) = self.mode {
            config.run.mode = mode;
        }
        if let Some(secs) = self.duration_secs {
            config.run.duration_secs = secs;
        }
        if let Some(eat_ms) = self.eat_ms {
            config.savages.eat_ms = eat_ms;
        }
        if let Some(jitter_ms) = self.jitter_ms {
            config.savages.jitter_ms = jitter_ms;
        }
        if self.no_persist {
            config.events.persist = false;
        }
        if self.quiet {
            config.events.echo = false;
        }
        if let Some(runs_dir) = &self.runs_dir {
            config.events.runs_dir = runs_dir.clone();
        }
    }
}

/// Startup rule of the command line: more savages than servings
///
/// The engine itself accepts any positive sizes.
pub fn validate_tribe(capacity: usize, savages: usize) -> Result<(), EngineError> {
    debug!(capacity, savages, "validate_tribe: called");
    if capacity == 0 {
        return Err(EngineError::invalid("pot capacity must be positive"));
    }
    if savages <= capacity {
        return Err(EngineError::invalid(format!(
            "number of savages ({}) must be greater than the pot capacity ({})",
            savages, capacity
        )));
    }
    Ok(())
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("savagepot")
        .join("logs")
        .join("sp.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}

/// Output format for reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
