use crate::limits::TraceLimits;
use serde::{Deserialize, Serialize};

pub const TRACE_LOG_ENTRY: &str = "trace.trace";
pub const RESOURCE_PREFIX: &str = "resources/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryClass {
    PassThrough,
    TraceLog,
    DroppedResource,
}

pub fn classify_entry(name: &str, size: u64, limits: &TraceLimits) -> EntryClass {
    if name == TRACE_LOG_ENTRY {
        return EntryClass::TraceLog;
    }
    if name.starts_with(RESOURCE_PREFIX) && size > limits.max_resource_file_size {
        return EntryClass::DroppedResource;
    }
    EntryClass::PassThrough
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
