pub mod archive;
pub mod batch;
pub mod limits;
pub mod trace;

pub use archive::{
    classify_entry, temp_path_for, ArchiveReport, ArchiveRewriter, DiscardSink, DroppedResource,
    EntryClass, EntrySink, LineAnomaly, RewriteError, ZipSink, RESOURCE_PREFIX, TEMP_SUFFIX,
    TRACE_LOG_ENTRY,
};
pub use batch::{
    discover_trace_archives, run_batch, ArchiveOutcome, ArchiveStatus, BatchOptions, BatchReport,
    CancelFlag, DiscoverError, ARCHIVE_EXTENSION, DATA_DIR,
};
pub use limits::{
    TraceLimits, DEFAULT_MAX_RESOURCE_FILE_SIZE, DEFAULT_MAX_SCAN_LINE_LENGTH,
    DEFAULT_MAX_TRACE_LINE_LENGTH,
};
pub use trace::{
    descend, shorten_trace_line, LineScanError, LineScanner, ObjectLookup, ShortenOutcome,
    ShortenedLine, KEEP_CHARS, SNIP_MARKER,
};
