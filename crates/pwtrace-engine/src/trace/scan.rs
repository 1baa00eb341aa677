use std::io::{BufRead, Read};

#[derive(Debug, thiserror::Error)]
pub enum LineScanError {
    #[error("read trace line {line} failed: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("trace line {line} exceeds the {limit} byte scan limit")]
    TooLong { line: usize, limit: usize },
}

/// Splits a stream into newline-delimited lines without their terminator.
///
/// A `\r` right before the terminator (or at end of input) is dropped too,
/// and a final line without a newline is still yielded. The internal buffer
/// only grows as far as the longest line seen, capped at `max_line_length`.
pub struct LineScanner<R> {
    reader: R,
    max_line_length: usize,
    buffer: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LineScanner<R> {
    pub fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            max_line_length,
            buffer: Vec::new(),
            line_number: 0,
        }
    }

    pub fn next_line(&mut self) -> Result<Option<&[u8]>, LineScanError> {
        self.buffer.clear();
        let line = self.line_number + 1;
        // Room for the line, "\r\n", and one byte to detect overflow.
        let budget = self.max_line_length.saturating_add(2) as u64;
        let read = (&mut self.reader)
            .take(budget)
            .read_until(b'\n', &mut self.buffer)
            .map_err(|source| LineScanError::Io { line, source })?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = self.buffer.last() == Some(&b'\n');
        if terminated {
            self.buffer.pop();
        }
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        if self.buffer.len() > self.max_line_length {
            return Err(LineScanError::TooLong {
                line,
                limit: self.max_line_length,
            });
        }

        self.line_number = line;
        Ok(Some(self.buffer.as_slice()))
    }
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod tests;
