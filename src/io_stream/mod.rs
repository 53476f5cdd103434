//! Positioned byte I/O over a separate source and sink.
//!
//! [`ByteStream`] owns an optional reader and an optional writer.  Each keeps
//! its own implicit cursor, so reading and writing never disturb each other
//! even when both wrap the same file.
//!
//! Every `read`/`write` accepts an optional absolute position.  When one is
//! given the operation happens there and the implicit cursor is restored
//! afterwards, which lets the archive writer drop a payload at the data
//! cursor and come back to the header slot it left.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{PakError, PakResult};

pub struct ByteStream<R, W> {
    source: Option<R>,
    sink:   Option<W>,
}

impl<R, W> ByteStream<R, W> {
    pub fn new(source: Option<R>, sink: Option<W>) -> Self {
        Self { source, sink }
    }

    pub fn into_parts(self) -> (Option<R>, Option<W>) {
        (self.source, self.sink)
    }
}

impl<R: Read + Seek> ByteStream<R, io::Sink> {
    /// Read-only stream.
    pub fn from_source(source: R) -> Self {
        Self::new(Some(source), None)
    }
}

impl<W: Write + Seek> ByteStream<io::Empty, W> {
    /// Write-only stream.
    pub fn from_sink(sink: W) -> Self {
        Self::new(None, Some(sink))
    }
}

// ── Source side ──────────────────────────────────────────────────────────────

impl<R: Read + Seek, W> ByteStream<R, W> {
    fn source(&mut self) -> PakResult<&mut R> {
        self.source.as_mut().ok_or(PakError::IoUnavailable("source"))
    }

    /// Fill `buf` completely, at `at` if given, else at the reader cursor.
    pub fn read(&mut self, buf: &mut [u8], at: Option<SeekFrom>) -> PakResult<()> {
        let source = self.source()?;
        let origin = match at {
            Some(pos) => {
                let origin = source.stream_position()?;
                source.seek(pos)?;
                Some(origin)
            }
            None => None,
        };

        let offset = source.stream_position()?;
        let result = source.read_exact(buf);

        if let Some(origin) = origin {
            source.seek(SeekFrom::Start(origin))?;
        }

        result.map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PakError::ShortRead { expected: buf.len(), offset },
            _ => PakError::Io(e),
        })
    }

    pub fn reader_cursor(&mut self) -> PakResult<u64> {
        Ok(self.source()?.stream_position()?)
    }

    /// Total length of the source.  The reader cursor is left where it was.
    pub fn source_len(&mut self) -> PakResult<u64> {
        let source = self.source()?;
        let origin = source.stream_position()?;
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(origin))?;
        Ok(len)
    }

    /// Move the reader cursor, returning where it was before the move.
    pub fn set_reader_cursor(&mut self, pos: SeekFrom) -> PakResult<u64> {
        let source = self.source()?;
        let origin = source.stream_position()?;
        source.seek(pos)?;
        Ok(origin)
    }
}

// ── Sink side ────────────────────────────────────────────────────────────────

impl<R, W: Write + Seek> ByteStream<R, W> {
    fn sink(&mut self) -> PakResult<&mut W> {
        self.sink.as_mut().ok_or(PakError::IoUnavailable("sink"))
    }

    /// Write all of `buf`, at `at` if given, else at the writer cursor.
    pub fn write(&mut self, buf: &[u8], at: Option<SeekFrom>) -> PakResult<()> {
        let sink = self.sink()?;
        let origin = match at {
            Some(pos) => {
                let origin = sink.stream_position()?;
                sink.seek(pos)?;
                Some(origin)
            }
            None => None,
        };

        let offset = sink.stream_position()?;
        let result = sink.write_all(buf);

        if let Some(origin) = origin {
            sink.seek(SeekFrom::Start(origin))?;
        }

        result.map_err(|e| match e.kind() {
            io::ErrorKind::WriteZero => PakError::ShortWrite { expected: buf.len(), offset },
            _ => PakError::Io(e),
        })
    }

    pub fn writer_cursor(&mut self) -> PakResult<u64> {
        Ok(self.sink()?.stream_position()?)
    }

    /// Move the writer cursor, returning where it was before the move.
    pub fn set_writer_cursor(&mut self, pos: SeekFrom) -> PakResult<u64> {
        let sink = self.sink()?;
        let origin = sink.stream_position()?;
        sink.seek(pos)?;
        Ok(origin)
    }

    pub fn flush(&mut self) -> PakResult<()> {
        Ok(self.sink()?.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn positioned_read_restores_cursor() {
        let mut stream = ByteStream::from_source(Cursor::new(b"0123456789".to_vec()));
        let mut head = [0u8; 2];
        stream.read(&mut head, None).unwrap();
        assert_eq!(&head, b"01");

        let mut tail = [0u8; 3];
        stream.read(&mut tail, Some(SeekFrom::Start(7))).unwrap();
        assert_eq!(&tail, b"789");
        assert_eq!(stream.reader_cursor().unwrap(), 2);

        stream.read(&mut head, None).unwrap();
        assert_eq!(&head, b"23");
    }

    #[test]
    fn short_read_reports_offset() {
        let mut stream = ByteStream::from_source(Cursor::new(vec![1u8; 4]));
        let mut buf = [0u8; 8];
        match stream.read(&mut buf, Some(SeekFrom::Start(2))) {
            Err(PakError::ShortRead { expected: 8, offset: 2 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(stream.reader_cursor().unwrap(), 0);
    }

    #[test]
    fn set_cursor_returns_previous_position() {
        let mut stream = ByteStream::from_sink(Cursor::new(Vec::new()));
        stream.write(b"abcd", None).unwrap();
        let origin = stream.set_writer_cursor(SeekFrom::Start(10)).unwrap();
        assert_eq!(origin, 4);
        stream.write(b"xy", None).unwrap();
        let back = stream.set_writer_cursor(SeekFrom::Start(origin)).unwrap();
        assert_eq!(back, 12);
        stream.write(b"ef", None).unwrap();

        let (_, sink) = stream.into_parts();
        let bytes = sink.unwrap().into_inner();
        assert_eq!(&bytes[..6], b"abcdef");
        assert_eq!(&bytes[10..12], b"xy");
    }

    #[test]
    fn missing_side_is_unavailable() {
        let mut stream: ByteStream<Cursor<Vec<u8>>, Cursor<Vec<u8>>> =
            ByteStream::new(Some(Cursor::new(Vec::new())), None);
        assert!(matches!(stream.write(b"x", None), Err(PakError::IoUnavailable("sink"))));

        let mut stream: ByteStream<Cursor<Vec<u8>>, Cursor<Vec<u8>>> =
            ByteStream::new(None, Some(Cursor::new(Vec::new())));
        let mut buf = [0u8; 1];
        assert!(matches!(stream.read(&mut buf, None), Err(PakError::IoUnavailable("source"))));
    }

    #[test]
    fn source_len_keeps_cursor() {
        let mut stream = ByteStream::from_source(Cursor::new(vec![0u8; 10]));
        stream.set_reader_cursor(SeekFrom::Start(4)).unwrap();
        assert_eq!(stream.source_len().unwrap(), 10);
        assert_eq!(stream.reader_cursor().unwrap(), 4);
    }

    #[test]
    fn cursors_are_independent() {
        let mut stream = ByteStream::new(
            Some(Cursor::new(b"source".to_vec())),
            Some(Cursor::new(Vec::new())),
        );
        stream.set_reader_cursor(SeekFrom::Start(3)).unwrap();
        stream.write(b"sink", None).unwrap();
        assert_eq!(stream.reader_cursor().unwrap(), 3);
        assert_eq!(stream.writer_cursor().unwrap(), 4);
    }
}
