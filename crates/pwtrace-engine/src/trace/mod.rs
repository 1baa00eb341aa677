mod lookup;
mod scan;
mod shorten;

pub use lookup::{descend, ObjectLookup};
pub use scan::{LineScanError, LineScanner};
pub use shorten::{shorten_trace_line, ShortenOutcome, ShortenedLine, KEEP_CHARS, SNIP_MARKER};
