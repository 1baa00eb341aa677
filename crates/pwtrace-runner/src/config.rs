use crate::cli::CleanCommand;
use pwtrace_core::{FieldPath, StructuredIssue};
use pwtrace_engine::TraceLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_runner_schema")]
    pub schema: String,
    #[serde(default)]
    pub limits: TraceLimits,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema: default_runner_schema(),
            limits: TraceLimits::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { jobs: default_jobs() }
    }
}

impl RunnerConfig {
    /// Command-line values win over the config file.
    pub fn apply_overrides(&mut self, command: &CleanCommand) {
        if let Some(size) = command.max_resource_file_size {
            self.limits.max_resource_file_size = size;
        }
        if let Some(length) = command.max_trace_line_length {
            self.limits.max_trace_line_length = length;
        }
        if let Some(length) = command.max_scan_line_length {
            self.limits.max_scan_line_length = length;
        }
        if let Some(jobs) = command.jobs {
            self.batch.jobs = jobs;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerConfigError {
    #[error("read runner config failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("runner config parse failed: {0}")]
    Parse(String),
}

/// Reads and parses a config file. Validation happens once command-line
/// overrides have been applied.
pub fn load_runner_config(path: &Path) -> Result<RunnerConfig, RunnerConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| RunnerConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(raw.as_str()).map_err(RunnerConfigError::Parse)?;
    let config: RunnerConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(expanded.as_str()).map_err(|error| {
            RunnerConfigError::Parse(format!("json decode error: {error}"))
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(expanded.as_str()).map_err(|error| {
            RunnerConfigError::Parse(format!("yaml decode error: {error}"))
        })?,
        _ => serde_yaml::from_str(expanded.as_str())
            .or_else(|_| serde_json::from_str(expanded.as_str()))
            .map_err(|error| RunnerConfigError::Parse(error.to_string()))?,
    };
    Ok(config)
}

pub fn validate_runner_config(config: &RunnerConfig) -> Vec<StructuredIssue> {
    let mut issues = config.limits.validate();
    if config.schema != default_runner_schema() {
        issues.push(
            StructuredIssue::error(
                "runner_config_error",
                FieldPath::from_keys(["schema"]),
                format!(
                    "unsupported runner config schema `{}` (expected `{}`)",
                    config.schema,
                    default_runner_schema()
                ),
            )
            .with_reference("runner.config.schema"),
        );
    }
    if config.batch.jobs == 0 {
        issues.push(
            StructuredIssue::error(
                "runner_config_error",
                FieldPath::from_keys(["batch", "jobs"]),
                "batch.jobs must be > 0",
            )
            .with_reference("runner.config.batch.jobs"),
        );
    }
    StructuredIssue::sort_stable(&mut issues);
    issues
}

pub fn render_issues(issues: &[StructuredIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn default_runner_schema() -> String {
    "pwtrace-runner/0.0.1".to_string()
}

fn default_jobs() -> usize {
    1
}

fn expand_env_placeholders(input: &str) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(start_offset) = input[cursor..].find("${") {
        let start = cursor + start_offset;
        out.push_str(&input[cursor..start]);
        let var_start = start + 2;
        let Some(end_offset) = input[var_start..].find('}') else {
            return Err("unterminated env placeholder `${...`".to_string());
        };
        let end = var_start + end_offset;
        let key = &input[var_start..end];
        if key.is_empty() {
            return Err("empty env placeholder `${}`".to_string());
        }
        let value = std::env::var(key)
            .map_err(|_| format!("missing env var for placeholder `${{{key}}}`"))?;
        out.push_str(value.as_str());
        cursor = end + 1;
    }
    out.push_str(&input[cursor..]);
    Ok(out)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
