//! Forward-only PCM byte source.
//!
//! Wraps any `Read` with fread-style semantics: a chunk read keeps pulling
//! until the destination is full or the stream ends, so a short count means
//! end of stream and `0` means exhaustion. No seeking, single reader.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, VibepaceError};

/// A strictly forward PCM byte stream.
#[derive(Debug)]
pub struct PcmSource<R: Read> {
    inner: R,
}

impl PcmSource<File> {
    /// Open a file-backed source.
    ///
    /// # Errors
    /// `VibepaceError::SourceOpen` when the file cannot be opened — a fatal
    /// session-initialization error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| VibepaceError::SourceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> PcmSource<R> {
    /// Wrap an arbitrary reader (used by tests and in-memory sources).
    pub fn from_reader(inner: R) -> Self {
        Self { inner }
    }

    /// Fill `dst` from the current stream position.
    ///
    /// Returns the number of bytes read: `dst.len()` mid-stream, fewer only
    /// at end of stream, and `0` once the stream is exhausted.
    pub fn read_chunk(&mut self, dst: &mut [u8]) -> Result<usize> {
        let mut filled = 0;

        while filled < dst.len() {
            match self.inner.read(&mut dst[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn full_reads_until_eof() {
        let data: Vec<u8> = (0..10u8).collect();
        let mut source = PcmSource::from_reader(Cursor::new(data));

        let mut dst = [0u8; 4];
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 4);
        assert_eq!(dst, [0, 1, 2, 3]);
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 4);
        assert_eq!(dst, [4, 5, 6, 7]);

        // Short read at end of stream, then exhaustion.
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 2);
        assert_eq!(&dst[..2], [8, 9]);
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 0);
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 0);
    }

    #[test]
    fn fills_across_fragmented_reads() {
        // A reader that hands out one byte per call.
        struct Trickle(Vec<u8>);

        impl Read for Trickle {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0.remove(0);
                Ok(1)
            }
        }

        let mut source = PcmSource::from_reader(Trickle(vec![7, 8, 9]));
        let mut dst = [0u8; 3];
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 3);
        assert_eq!(dst, [7, 8, 9]);
    }

    #[test]
    fn opens_file_backed_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();

        let mut source = PcmSource::open(file.path()).unwrap();
        let mut dst = [0u8; 8];
        assert_eq!(source.read_chunk(&mut dst).unwrap(), 4);
        assert_eq!(&dst[..4], [1, 2, 3, 4]);
    }

    #[test]
    fn missing_file_is_fatal_open_error() {
        let err = PcmSource::open("/nonexistent/vibe.pcm").unwrap_err();
        assert!(matches!(err, VibepaceError::SourceOpen { .. }));
    }
}
