use crate::archive::{ArchiveReport, ArchiveRewriter, RewriteError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// Stops a batch from starting new archives. Archives already in flight
/// run to completion or abort on their own.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub jobs: usize,
    pub dry_run: bool,
    pub cancel: CancelFlag,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            dry_run: false,
            cancel: CancelFlag::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    Cleaned { report: ArchiveReport },
    Failed { error: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    pub archive: String,
    #[serde(flatten)]
    pub status: ArchiveStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub archives: Vec<ArchiveOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.archives.len()
    }

    pub fn cleaned_count(&self) -> usize {
        self.count(|status| matches!(status, ArchiveStatus::Cleaned { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|status| matches!(status, ArchiveStatus::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|status| matches!(status, ArchiveStatus::Skipped))
    }

    pub fn anomaly_count(&self) -> usize {
        self.archives
            .iter()
            .map(|outcome| match &outcome.status {
                ArchiveStatus::Cleaned { report } => report.anomalies.len(),
                _ => 0,
            })
            .sum()
    }

    /// Every archive was attempted and none failed.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0 && self.skipped_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.archives.iter().filter_map(|outcome| match &outcome.status {
            ArchiveStatus::Failed { error } => Some((outcome.archive.as_str(), error.as_str())),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&ArchiveStatus) -> bool) -> usize {
        self.archives
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

/// Processes every archive independently; one failure never stops the rest.
/// Outcomes are reported in the order of `paths`.
pub fn run_batch(paths: &[PathBuf], rewriter: &ArchiveRewriter, options: &BatchOptions) -> BatchReport {
    info!(archives = paths.len(), jobs = options.jobs, dry_run = options.dry_run, "cleaning trace archives");
    run_batch_with(paths, options, |path| {
        if options.dry_run {
            rewriter.inspect(path)
        } else {
            rewriter.rewrite(path)
        }
    })
}

fn run_batch_with<F>(paths: &[PathBuf], options: &BatchOptions, process: F) -> BatchReport
where
    F: Fn(&Path) -> Result<ArchiveReport, RewriteError> + Sync,
{
    let jobs = options.jobs.clamp(1, paths.len().max(1));
    let process = &process;

    let mut slots: Vec<Option<ArchiveOutcome>> = vec![None; paths.len()];
    if jobs == 1 {
        for (slot, path) in slots.iter_mut().zip(paths) {
            if options.cancel.is_cancelled() {
                break;
            }
            *slot = Some(process_archive(path, process));
        }
    } else {
        let next = AtomicUsize::new(0);
        let next = &next;
        let finished = thread::scope(|scope| {
            let workers = (0..jobs)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        while !options.cancel.is_cancelled() {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(path) = paths.get(index) else {
                                break;
                            };
                            done.push((index, process_archive(path, process)));
                        }
                        done
                    })
                })
                .collect::<Vec<_>>();
            workers
                .into_iter()
                .filter_map(|worker| worker.join().ok())
                .flatten()
                .collect::<Vec<_>>()
        });
        for (index, outcome) in finished {
            slots[index] = Some(outcome);
        }
    }

    let archives = slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| {
                warn!(archive = %path.display(), "trace archive skipped");
                ArchiveOutcome {
                    archive: path.display().to_string(),
                    status: ArchiveStatus::Skipped,
                }
            })
        })
        .collect();
    BatchReport { archives }
}

/// Runs one archive, turning an error or a panic into a `Failed` outcome.
fn process_archive<F>(path: &Path, process: &F) -> ArchiveOutcome
where
    F: Fn(&Path) -> Result<ArchiveReport, RewriteError>,
{
    let archive = path.display().to_string();
    info!(archive = %archive, "processing trace archive");
    let status = match catch_unwind(AssertUnwindSafe(|| process(path))) {
        Ok(Ok(report)) => ArchiveStatus::Cleaned { report },
        Ok(Err(failure)) => {
            error!(archive = %archive, error = %failure, "failed to process trace archive");
            ArchiveStatus::Failed {
                error: failure.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(archive = %archive, panic = %message, "trace archive processing panicked");
            ArchiveStatus::Failed {
                error: format!("processing panicked: {message}"),
            }
        }
    };
    ArchiveOutcome { archive, status }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        return (*text).to_string();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "unknown panic payload".to_string()
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
