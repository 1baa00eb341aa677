mod cli;
mod config;
mod logging;
mod run;

pub use cli::{Cli, CleanCommand, Commands, OutputFormat};
pub use config::{
    load_runner_config, render_issues, validate_runner_config, BatchConfig, RunnerConfig,
    RunnerConfigError,
};
pub use logging::{setup_logging, verbosity_filter};
pub use run::{
    collect_archive_paths, execute_clean, execute_inspect, resolve_runner_config, RunOutput,
    RunnerError,
};
