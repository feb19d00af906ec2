//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a flow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to flow YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Seed inputs for every root pipe (key=value, value parsed as YAML)
    #[arg(long, value_parser = parse_key_value)]
    pub input: Vec<(String, String)>,

    /// How lifecycle events are reported
    #[arg(long, value_enum, default_value_t = ReporterArg::Console)]
    pub reporter: ReporterArg,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Validate a flow without running it
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to flow YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Print the validated graph in Graphviz DOT format
    #[arg(long)]
    pub dot: bool,

    /// Print the parsed configuration as JSON
    #[arg(long)]
    pub json: bool,
}

/// Listener attached to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReporterArg {
    /// Progress bar and per-pipe summaries
    Console,
    /// Lifecycle events through the log
    Log,
    /// Nothing but the final status
    Quiet,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
