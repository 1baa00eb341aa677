mod discover;
mod driver;

pub use discover::{discover_trace_archives, DiscoverError, ARCHIVE_EXTENSION, DATA_DIR};
pub use driver::{run_batch, ArchiveOutcome, ArchiveStatus, BatchOptions, BatchReport, CancelFlag};
