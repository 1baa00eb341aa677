use crate::cli::{CleanCommand, OutputFormat};
use crate::config::{load_runner_config, render_issues, validate_runner_config, RunnerConfig, RunnerConfigError};
use pwtrace_core::StructuredIssue;
use pwtrace_engine::{
    discover_trace_archives, run_batch, ArchiveReport, ArchiveRewriter, ArchiveStatus,
    BatchOptions, BatchReport, CancelFlag, DiscoverError,
};
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("runner config load failed: {0}")]
    ConfigLoad(#[from] RunnerConfigError),
    #[error("invalid settings: {}", render_issues(.0))]
    InvalidSettings(Vec<StructuredIssue>),
    #[error("trace archive discovery failed: {0}")]
    Discover(#[from] DiscoverError),
    #[error("json encode failed: {0}")]
    JsonEncode(#[from] serde_json::Error),
}

/// Rendered report plus the counts the process exit code depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub rendered: String,
    pub total: usize,
    pub failed: usize,
    pub skipped: usize,
    pub dry_run: bool,
}

impl RunOutput {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn summary(&self) -> String {
        summary_line(self.total, self.failed, self.skipped, self.dry_run)
    }
}

pub fn execute_clean(command: &CleanCommand) -> Result<RunOutput, RunnerError> {
    execute(command, false)
}

pub fn execute_inspect(command: &CleanCommand) -> Result<RunOutput, RunnerError> {
    execute(command, true)
}

pub fn resolve_runner_config(command: &CleanCommand) -> Result<RunnerConfig, RunnerError> {
    let mut config = match &command.config {
        Some(path) => load_runner_config(path.as_path())?,
        None => RunnerConfig::default(),
    };
    config.apply_overrides(command);
    let issues = validate_runner_config(&config);
    if !issues.is_empty() {
        return Err(RunnerError::InvalidSettings(issues));
    }
    Ok(config)
}

pub fn collect_archive_paths(command: &CleanCommand) -> Result<Vec<PathBuf>, RunnerError> {
    let mut paths = match &command.report_dir {
        Some(report_dir) => discover_trace_archives(report_dir.as_path())?,
        None => Vec::new(),
    };
    for archive in &command.archives {
        if !paths.contains(archive) {
            paths.push(archive.clone());
        }
    }
    Ok(paths)
}

fn execute(command: &CleanCommand, dry_run: bool) -> Result<RunOutput, RunnerError> {
    let config = resolve_runner_config(command)?;
    let paths = collect_archive_paths(command)?;
    let rewriter = ArchiveRewriter::new(config.limits);
    let options = BatchOptions {
        jobs: config.batch.jobs,
        dry_run,
        cancel: CancelFlag::new(),
    };

    let report = run_batch(&paths, &rewriter, &options);
    let output = RunOutput {
        rendered: String::new(),
        total: report.total(),
        failed: report.failed_count(),
        skipped: report.skipped_count(),
        dry_run,
    };
    info!(
        total = output.total,
        failed = output.failed,
        skipped = output.skipped,
        anomalies = report.anomaly_count(),
        "{}",
        output.summary()
    );

    let rendered = match command.format {
        OutputFormat::Text => render_text(&report, &output),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "schema": "pwtrace-runner-clean/0.0.1",
            "dry_run": dry_run,
            "limits": rewriter.limits(),
            "jobs": config.batch.jobs,
            "summary": {
                "total": output.total,
                "cleaned": report.cleaned_count(),
                "failed": output.failed,
                "skipped": output.skipped,
                "anomalies": report.anomaly_count(),
            },
            "archives": report.archives,
        }))?,
    };
    Ok(RunOutput { rendered, ..output })
}

fn render_text(report: &BatchReport, output: &RunOutput) -> String {
    let mut out = String::new();
    let title = if output.dry_run {
        "pwtrace inspect (dry-run)"
    } else {
        "pwtrace clean"
    };
    let _ = writeln!(out, "{title}");
    for outcome in &report.archives {
        match &outcome.status {
            ArchiveStatus::Cleaned { report } => render_archive(&mut out, report),
            ArchiveStatus::Failed { error } => {
                let _ = writeln!(out, "- {}: failed: {error}", outcome.archive);
            }
            ArchiveStatus::Skipped => {
                let _ = writeln!(out, "- {}: skipped", outcome.archive);
            }
        }
    }
    out.push_str(output.summary().as_str());
    out
}

fn render_archive(out: &mut String, report: &ArchiveReport) {
    let bytes = match report.bytes_after {
        Some(after) => format!("{}->{}", report.bytes_before, after),
        None => report.bytes_before.to_string(),
    };
    let _ = writeln!(
        out,
        "- {}: entries={}->{} dropped={} trace_lines={} oversized_lines={} anomalies={} bytes={}",
        report.archive,
        report.entries_read,
        report.entries_written,
        report.dropped_resources.len(),
        report.trace_lines,
        report.oversized_lines,
        report.anomalies.len(),
        bytes,
    );
    for dropped in &report.dropped_resources {
        let _ = writeln!(out, "    dropped {} ({} bytes)", dropped.name, dropped.size);
    }
    for anomaly in &report.anomalies {
        let _ = writeln!(out, "    line {}: {}", anomaly.line, anomaly.outcome);
    }
}

fn summary_line(total: usize, failed: usize, skipped: usize, dry_run: bool) -> String {
    if failed > 0 {
        return format!("{failed} errors occurred cleaning {total} trace files");
    }
    if skipped > 0 {
        return format!("{skipped} of {total} trace files were skipped");
    }
    if dry_run {
        return format!("{total} trace files inspected successfully");
    }
    format!("{total} trace files processed successfully")
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
