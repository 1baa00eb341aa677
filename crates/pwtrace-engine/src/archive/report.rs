use crate::trace::ShortenOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedResource {
    pub name: String,
    pub size: u64,
}

/// A trace line that went through the shortener and came out degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnomaly {
    pub line: usize,
    pub input_length: usize,
    pub output_length: usize,
    pub outcome: ShortenOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub archive: String,
    pub dry_run: bool,
    pub entries_read: usize,
    pub entries_written: usize,
    #[serde(default)]
    pub dropped_resources: Vec<DroppedResource>,
    pub trace_lines: usize,
    pub oversized_lines: usize,
    #[serde(default)]
    pub anomalies: Vec<LineAnomaly>,
    pub bytes_before: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_after: Option<u64>,
}

impl ArchiveReport {
    pub fn new(archive: impl Into<String>, dry_run: bool, bytes_before: u64) -> Self {
        Self {
            archive: archive.into(),
            dry_run,
            entries_read: 0,
            entries_written: 0,
            dropped_resources: Vec::new(),
            trace_lines: 0,
            oversized_lines: 0,
            anomalies: Vec::new(),
            bytes_before,
            bytes_after: None,
        }
    }
}
