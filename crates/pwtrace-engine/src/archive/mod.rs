mod classify;
mod directory;
mod report;
mod rewrite;
mod sink;

pub use classify::{classify_entry, EntryClass, RESOURCE_PREFIX, TRACE_LOG_ENTRY};
pub use directory::declared_entry_count;
pub use report::{ArchiveReport, DroppedResource, LineAnomaly};
pub use rewrite::{temp_path_for, ArchiveRewriter, RewriteError, TEMP_SUFFIX};
pub use sink::{DiscardSink, EntrySink, ZipSink};
