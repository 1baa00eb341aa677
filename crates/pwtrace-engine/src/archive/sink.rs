use std::io::{Read, Seek, Write};
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Destination for the entries the rewriter keeps.
pub trait EntrySink {
    /// Copies entry `index` of `archive` without recompressing it.
    fn copy_entry<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>, index: usize) -> ZipResult<()>;
    fn start_trace_log(&mut self, name: &str, large_file: bool) -> ZipResult<()>;
    /// Appends `line` plus a single `\n` to the current trace log entry.
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()>;
}

pub struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
        }
    }

    pub fn set_comment(&mut self, comment: &[u8]) {
        self.writer.set_raw_comment(comment.into());
    }

    pub fn finish(self) -> ZipResult<W> {
        self.writer.finish()
    }
}

impl<W: Write + Seek> EntrySink for ZipSink<W> {
    fn copy_entry<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>, index: usize) -> ZipResult<()> {
        let entry = archive.by_index_raw(index)?;
        self.writer.raw_copy_file(entry)
    }

    fn start_trace_log(&mut self, name: &str, large_file: bool) -> ZipResult<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(large_file);
        self.writer.start_file(name, options)
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")
    }
}

/// Accepts everything and writes nothing; used for dry runs.
#[derive(Debug, Default)]
pub struct DiscardSink;

impl EntrySink for DiscardSink {
    fn copy_entry<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>, index: usize) -> ZipResult<()> {
        archive.by_index_raw(index).map(|_| ())
    }

    fn start_trace_log(&mut self, _name: &str, _large_file: bool) -> ZipResult<()> {
        Ok(())
    }

    fn write_line(&mut self, _line: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}
