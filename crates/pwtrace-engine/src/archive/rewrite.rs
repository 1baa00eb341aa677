use super::classify::{classify_entry, EntryClass};
use super::directory::declared_entry_count;
use super::report::{ArchiveReport, DroppedResource, LineAnomaly};
use super::sink::{DiscardSink, EntrySink, ZipSink};
use crate::limits::TraceLimits;
use crate::trace::{shorten_trace_line, LineScanError, LineScanner};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Suffix of the sibling file the new archive is built in.
pub const TEMP_SUFFIX: &str = ".new";

const READ_BUFFER_SIZE: usize = 64 * 1024;
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("open trace archive `{path}` failed: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read trace archive `{path}` failed: {source}")]
    OpenArchive {
        path: String,
        #[source]
        source: ZipError,
    },
    #[error("trace archive `{path}` declares {declared} entries but only {distinct} have distinct names")]
    DuplicateEntries {
        path: String,
        declared: u64,
        distinct: usize,
    },
    #[error("create temporary archive `{path}` failed: {source}")]
    CreateTemp {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read entry `{entry}` of `{path}` failed: {source}")]
    ReadEntry {
        path: String,
        entry: String,
        #[source]
        source: ZipError,
    },
    #[error("write entry `{entry}` of `{path}` failed: {source}")]
    WriteEntry {
        path: String,
        entry: String,
        #[source]
        source: ZipError,
    },
    #[error("write line {line} of `{entry}` in `{path}` failed: {source}")]
    WriteLine {
        path: String,
        entry: String,
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("scan entry `{entry}` of `{path}` failed: {source}")]
    ScanEntry {
        path: String,
        entry: String,
        #[source]
        source: LineScanError,
    },
    #[error("finalize temporary archive `{path}` failed: {source}")]
    Finish {
        path: String,
        #[source]
        source: ZipError,
    },
    #[error("flush temporary archive `{path}` failed: {source}")]
    Flush {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("replace `{path}` with `{temp}` failed: {source}")]
    Replace {
        path: String,
        temp: String,
        #[source]
        source: std::io::Error,
    },
}

/// Rewrites trace archives in place, all or nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveRewriter {
    limits: TraceLimits,
}

impl ArchiveRewriter {
    pub fn new(limits: TraceLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &TraceLimits {
        &self.limits
    }

    /// Builds the cleaned archive next to `path` and renames it over `path`.
    /// On error the original is left untouched and the temporary file is removed.
    pub fn rewrite(&self, path: &Path) -> Result<ArchiveReport, RewriteError> {
        let archive_name = path.display().to_string();
        let (mut archive, bytes_before) = open_archive(path)?;
        let temp_path = temp_path_for(path);
        let pending = PendingOutput::new(temp_path.clone());
        let file = File::create(&temp_path).map_err(|source| RewriteError::CreateTemp {
            path: temp_path.display().to_string(),
            source,
        })?;
        let mut sink = ZipSink::new(file);
        sink.set_comment(archive.comment());

        let mut report = ArchiveReport::new(archive_name.as_str(), false, bytes_before);
        self.rewrite_entries(archive_name.as_str(), &mut archive, &mut sink, &mut report)?;

        let file = sink.finish().map_err(|source| RewriteError::Finish {
            path: temp_path.display().to_string(),
            source,
        })?;
        file.sync_all().map_err(|source| RewriteError::Flush {
            path: temp_path.display().to_string(),
            source,
        })?;
        drop(file);
        drop(archive);

        fs::rename(&temp_path, path).map_err(|source| RewriteError::Replace {
            path: archive_name.clone(),
            temp: temp_path.display().to_string(),
            source,
        })?;
        pending.commit();

        report.bytes_after = fs::metadata(path).ok().map(|metadata| metadata.len());
        info!(
            archive = %archive_name,
            entries_read = report.entries_read,
            entries_written = report.entries_written,
            dropped = report.dropped_resources.len(),
            oversized_lines = report.oversized_lines,
            bytes_before = report.bytes_before,
            bytes_after = ?report.bytes_after,
            "trace archive rewritten"
        );
        Ok(report)
    }

    /// Runs the same classification and shortening as [`Self::rewrite`] without
    /// writing anything.
    pub fn inspect(&self, path: &Path) -> Result<ArchiveReport, RewriteError> {
        let archive_name = path.display().to_string();
        let (mut archive, bytes_before) = open_archive(path)?;
        let mut report = ArchiveReport::new(archive_name.as_str(), true, bytes_before);
        self.rewrite_entries(archive_name.as_str(), &mut archive, &mut DiscardSink, &mut report)?;
        info!(
            archive = %archive_name,
            entries_read = report.entries_read,
            dropped = report.dropped_resources.len(),
            oversized_lines = report.oversized_lines,
            "trace archive inspected"
        );
        Ok(report)
    }

    fn rewrite_entries<R: Read + Seek, S: EntrySink>(
        &self,
        path: &str,
        archive: &mut ZipArchive<R>,
        sink: &mut S,
        report: &mut ArchiveReport,
    ) -> Result<(), RewriteError> {
        for index in 0..archive.len() {
            let (name, size) = {
                let entry = archive.by_index_raw(index).map_err(|source| RewriteError::ReadEntry {
                    path: path.to_string(),
                    entry: format!("#{index}"),
                    source,
                })?;
                (entry.name().to_string(), entry.size())
            };
            report.entries_read += 1;

            let class = classify_entry(name.as_str(), size, &self.limits);
            debug!(archive = path, entry = %name, size, ?class, "archive entry");
            match class {
                EntryClass::DroppedResource => {
                    report.dropped_resources.push(DroppedResource { name, size });
                    continue;
                }
                EntryClass::PassThrough => {
                    sink.copy_entry(archive, index)
                        .map_err(|source| RewriteError::WriteEntry {
                            path: path.to_string(),
                            entry: name.clone(),
                            source,
                        })?;
                }
                EntryClass::TraceLog => {
                    self.rewrite_trace_log(path, archive, index, name.as_str(), size, sink, report)?;
                }
            }
            report.entries_written += 1;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn rewrite_trace_log<R: Read + Seek, S: EntrySink>(
        &self,
        path: &str,
        archive: &mut ZipArchive<R>,
        index: usize,
        name: &str,
        size: u64,
        sink: &mut S,
        report: &mut ArchiveReport,
    ) -> Result<(), RewriteError> {
        let entry = archive.by_index(index).map_err(|source| RewriteError::ReadEntry {
            path: path.to_string(),
            entry: name.to_string(),
            source,
        })?;
        sink.start_trace_log(name, size >= ZIP64_THRESHOLD)
            .map_err(|source| RewriteError::WriteEntry {
                path: path.to_string(),
                entry: name.to_string(),
                source,
            })?;

        let max_line_length = self.limits.max_trace_line_length;
        let mut scanner = LineScanner::new(
            BufReader::with_capacity(READ_BUFFER_SIZE, entry),
            self.limits.max_scan_line_length,
        );
        loop {
            let line = match scanner.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => {
                    return Err(RewriteError::ScanEntry {
                        path: path.to_string(),
                        entry: name.to_string(),
                        source,
                    })
                }
            };
            report.trace_lines += 1;
            let line_number = report.trace_lines;

            let written = if line.len() > max_line_length {
                report.oversized_lines += 1;
                let shortened = shorten_trace_line(line, max_line_length);
                if shortened.outcome.is_anomaly() {
                    warn!(
                        archive = path,
                        line = line_number,
                        outcome = %shortened.outcome,
                        "failed to shorten trace line"
                    );
                    report.anomalies.push(LineAnomaly {
                        line: line_number,
                        input_length: line.len(),
                        output_length: shortened.line.len(),
                        outcome: shortened.outcome.clone(),
                    });
                } else {
                    debug!(
                        archive = path,
                        line = line_number,
                        from = line.len(),
                        to = shortened.line.len(),
                        outcome = %shortened.outcome,
                        "trace line shortened"
                    );
                }
                sink.write_line(shortened.line.as_ref())
            } else {
                sink.write_line(line)
            };
            written.map_err(|source| RewriteError::WriteLine {
                path: path.to_string(),
                entry: name.to_string(),
                line: line_number,
                source,
            })?;
        }
        Ok(())
    }
}

pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn open_archive(path: &Path) -> Result<(ZipArchive<BufReader<File>>, u64), RewriteError> {
    let file = File::open(path).map_err(|source| RewriteError::OpenFile {
        path: path.display().to_string(),
        source,
    })?;
    let bytes_before = file
        .metadata()
        .map_err(|source| RewriteError::OpenFile {
            path: path.display().to_string(),
            source,
        })?
        .len();
    let mut reader = BufReader::new(file);
    let declared = declared_entry_count(&mut reader).map_err(|source| RewriteError::OpenFile {
        path: path.display().to_string(),
        source,
    })?;
    let archive = ZipArchive::new(reader).map_err(|source| RewriteError::OpenArchive {
        path: path.display().to_string(),
        source,
    })?;
    if let Some(declared) = declared {
        if declared > archive.len() as u64 {
            return Err(RewriteError::DuplicateEntries {
                path: path.display().to_string(),
                declared,
                distinct: archive.len(),
            });
        }
    }
    Ok((archive, bytes_before))
}

/// Removes the temporary archive unless it was renamed into place.
struct PendingOutput {
    path: PathBuf,
    committed: bool,
}

impl PendingOutput {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary archive"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                path = %self.path.display(),
                %error,
                "failed to remove temporary archive"
            ),
        }
    }
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod tests;
