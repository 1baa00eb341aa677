use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of a Playwright HTML report that holds the trace archives.
pub const DATA_DIR: &str = "data";
pub const ARCHIVE_EXTENSION: &str = "zip";

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("read trace data directory `{path}` failed: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Lists `<report_dir>/data/*.zip`, sorted by path.
pub fn discover_trace_archives(report_dir: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    let data_dir = report_dir.join(DATA_DIR);
    let read_dir_error = |source| DiscoverError::ReadDir {
        path: data_dir.display().to_string(),
        source,
    };

    let mut archives = Vec::new();
    for entry in fs::read_dir(&data_dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.extension().and_then(OsStr::to_str) == Some(ARCHIVE_EXTENSION) && path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    debug!(data_dir = %data_dir.display(), count = archives.len(), "discovered trace archives");
    Ok(archives)
}

#[cfg(test)]
#[path = "discover_test.rs"]
mod tests;
