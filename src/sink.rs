//! Buffering adapter that lends seekability to forward-only sinks.

use std::io::{self, Seek, SeekFrom, Write};

/// Captures all writes into a growable in-memory buffer, honoring seeks
/// within that buffer, and hands the finished bytes to the wrapped writer
/// on the first flush.
///
/// This is the supported route for muxing to a forward-only output: the
/// trailer's three patch writes land in the buffer, and
/// [`AviMuxer::write_trailer`](crate::AviMuxer::write_trailer) flushes the
/// completed file downstream.
pub struct BufferedWriteSeeker<W: Write> {
    inner: W,
    buf: Vec<u8>,
    pos: usize,
    flushed: bool,
}

impl<W: Write> BufferedWriteSeeker<W> {
    /// Wrap a forward-only writer.
    pub fn new(inner: W) -> Self {
        BufferedWriteSeeker {
            inner,
            buf: Vec::new(),
            pos: 0,
            flushed: false,
        }
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Flush (if pending) and return the wrapped writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for BufferedWriteSeeker<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.pos > self.buf.len() {
            // A seek past the end materializes the gap as zeros.
            self.buf.resize(self.pos, 0);
        }
        let overlap = (self.buf.len() - self.pos).min(data.len());
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.buf.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.flushed {
            self.inner.write_all(&self.buf)?;
            self.flushed = true;
        }
        self.inner.flush()
    }
}

impl<W: Write> Seek for BufferedWriteSeeker<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => self.buf.len() as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}
