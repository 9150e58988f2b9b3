use std::io::{self, Read, Seek, SeekFrom};

use crate::err::{DumpError, DumpResult};

/// Lengths come from the input, so larger reads grow the buffer as bytes actually arrive.
const MAX_UPFRONT_CAPACITY: usize = 64 * 1024;

// Inspired by https://github.com/mitsuhiko/unbox/src/formats/cab.rs
pub trait ReadSeek: Read + Seek {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

impl<T: Read + Seek> ReadSeek for T {}

/// Byte-source operations used by the decoder.
///
/// Every read is exact: a short read is reported as [`DumpError::EndOfInput`], carrying the
/// offset the read started at and how many bytes were actually left.
pub(crate) trait ReadExt: ReadSeek + Sized {
    #[inline]
    fn try_tell(&mut self) -> DumpResult<u64> {
        self.tell().map_err(|e| DumpError::io(e, 0))
    }

    fn try_read_exact(&mut self, len: usize, what: &'static str) -> DumpResult<Vec<u8>> {
        let offset = self.try_tell()?;
        let mut data = Vec::with_capacity(len.min(MAX_UPFRONT_CAPACITY));
        self.by_ref()
            .take(len as u64)
            .read_to_end(&mut data)
            .map_err(|e| DumpError::io(e, offset))?;

        if data.len() < len {
            return Err(DumpError::EndOfInput {
                what,
                offset,
                need: len,
                have: data.len(),
            });
        }

        Ok(data)
    }

    /// Consumes `len` bytes without keeping them.
    fn try_skip(&mut self, len: usize, what: &'static str) -> DumpResult<()> {
        let offset = self.try_tell()?;
        let skipped = io::copy(&mut self.by_ref().take(len as u64), &mut io::sink())
            .map_err(|e| DumpError::io(e, offset))?;

        if skipped < len as u64 {
            return Err(DumpError::EndOfInput {
                what,
                offset,
                need: len,
                have: skipped as usize,
            });
        }

        Ok(())
    }

    #[inline]
    fn try_seek_abs(&mut self, offset: u64) -> DumpResult<u64> {
        self.seek(SeekFrom::Start(offset))
            .map_err(|e| DumpError::io(e, offset))
    }
}

impl<T: ReadSeek> ReadExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_short_read_reports_available_bytes() {
        let mut cursor = Cursor::new(vec![1_u8, 2, 3]);
        cursor.try_skip(1, "prefix").unwrap();

        match cursor.try_read_exact(4, "field") {
            Err(DumpError::EndOfInput {
                what,
                offset,
                need,
                have,
            }) => {
                assert_eq!(what, "field");
                assert_eq!(offset, 1);
                assert_eq!(need, 4);
                assert_eq!(have, 2);
            }
            other => panic!("expected EndOfInput, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut cursor = Cursor::new(vec![0_u8; 8]);
        assert!(matches!(
            cursor.try_skip(9, "padding"),
            Err(DumpError::EndOfInput { have: 8, .. })
        ));
    }

    #[test]
    fn test_oversized_length_fails_on_short_input() {
        let mut cursor = Cursor::new(vec![0x41_u8; 6]);
        assert!(matches!(
            cursor.try_read_exact(usize::MAX / 2, "string body"),
            Err(DumpError::EndOfInput { have: 6, .. })
        ));
    }
}
