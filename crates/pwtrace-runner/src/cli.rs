use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "pwtrace-runner")]
#[command(about = "Shrinks Playwright trace archives in place")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Rewrite trace archives, dropping large resources and shortening long trace lines.
    Clean(CleanCommand),
    /// Report what `clean` would do without modifying any archive.
    Inspect(CleanCommand),
}

#[derive(Debug, Clone, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, clap::Args)]
pub struct CleanCommand {
    /// Playwright report directory; archives are read from its `data/` folder.
    #[arg(required_unless_present = "archives")]
    pub report_dir: Option<PathBuf>,
    /// Extra archive to process, may be repeated.
    #[arg(long = "archive")]
    pub archives: Vec<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, alias = "maxresource")]
    pub max_resource_file_size: Option<u64>,
    #[arg(long, alias = "maxline")]
    pub max_trace_line_length: Option<usize>,
    #[arg(long)]
    pub max_scan_line_length: Option<usize>,
    #[arg(long)]
    pub jobs: Option<usize>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
