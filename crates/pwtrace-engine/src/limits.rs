use pwtrace_core::{FieldPath, StructuredIssue};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESOURCE_FILE_SIZE: u64 = 1_000_000;
pub const DEFAULT_MAX_TRACE_LINE_LENGTH: usize = 1_000_000;
/// Hard ceiling for a single buffered trace line (1 GiB).
pub const DEFAULT_MAX_SCAN_LINE_LENGTH: usize = 1024 * 1024 * 1024;

/// Size thresholds applied while rewriting one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceLimits {
    /// Resource entries strictly larger than this are dropped.
    pub max_resource_file_size: u64,
    /// Trace lines strictly longer than this go through the shortener.
    pub max_trace_line_length: usize,
    /// A line longer than this aborts the archive.
    pub max_scan_line_length: usize,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_resource_file_size: DEFAULT_MAX_RESOURCE_FILE_SIZE,
            max_trace_line_length: DEFAULT_MAX_TRACE_LINE_LENGTH,
            max_scan_line_length: DEFAULT_MAX_SCAN_LINE_LENGTH,
        }
    }
}

impl TraceLimits {
    pub fn validate(&self) -> Vec<StructuredIssue> {
        let mut issues = Vec::new();
        if self.max_resource_file_size == 0 {
            issues.push(limit_issue(
                "max_resource_file_size",
                "max_resource_file_size must be > 0".to_string(),
            ));
        }
        if self.max_trace_line_length == 0 {
            issues.push(limit_issue(
                "max_trace_line_length",
                "max_trace_line_length must be > 0".to_string(),
            ));
        }
        if self.max_scan_line_length < self.max_trace_line_length {
            issues.push(limit_issue(
                "max_scan_line_length",
                format!(
                    "max_scan_line_length ({}) must be >= max_trace_line_length ({})",
                    self.max_scan_line_length, self.max_trace_line_length
                ),
            ));
        }
        StructuredIssue::sort_stable(&mut issues);
        issues
    }
}

fn limit_issue(field: &str, message: String) -> StructuredIssue {
    StructuredIssue::error("limits_invalid", FieldPath::from_keys(["limits", field]), message)
        .with_reference("engine.limits")
}

#[cfg(test)]
#[path = "limits_test.rs"]
mod tests;
