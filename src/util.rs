//! Low-level stream utilities: the in-memory cursor and little-endian
//! integer decoding.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use snafu::{ensure, ResultExt};

use crate::error::{
    IntegerTooWideSnafu, IoSnafu, ReadError, Result, UnexpectedEndOfStreamSnafu,
};

/// Reads the whole file into memory.
///
/// DICOM files handled here are single-frame and modest in size, so buffering
/// the full content keeps seek and search trivial. The handle is scoped to
/// this function and closed on every exit path.
pub fn read_file_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    let mut file = File::open(path).context(IoSnafu { path })?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).context(IoSnafu { path })?;
    Ok(content)
}

/// An exclusively-owned cursor over an in-memory byte stream.
///
/// The read position only moves forward through normal use; `seek_to` is the
/// one absolute reposition, used for the preamble.
#[derive(Debug)]
pub struct Cursor {
    data: Vec<u8>,
    pos: usize,
}

impl Cursor {
    pub fn new(data: Vec<u8>) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Current read position, in bytes from the start of the stream.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the stream.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Moves the position to an absolute offset.
    pub fn seek_to(&mut self, offset: usize) -> Result<()> {
        ensure!(
            offset <= self.data.len(),
            UnexpectedEndOfStreamSnafu {
                offset: self.data.len(),
                needed: offset - self.data.len(),
            }
        );
        self.pos = offset;
        Ok(())
    }

    /// Advances the position by `count` bytes without yielding them.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.check_available(count)?;
        self.pos += count;
        Ok(())
    }

    /// Yields the next `count` bytes and advances past them.
    pub fn read(&mut self, count: usize) -> Result<&[u8]> {
        self.check_available(count)?;
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Substring search for `pattern` from the current position to the end
    /// of the stream. On a match the position advances just past the
    /// pattern and the match offset is returned; on `None` the position is
    /// left untouched.
    pub fn find_forward(&mut self, pattern: &[u8]) -> Option<usize> {
        let hit = self.data[self.pos..]
            .windows(pattern.len())
            .position(|window| window == pattern)?;
        let at = self.pos + hit;
        self.pos = at + pattern.len();
        Some(at)
    }

    fn check_available(&self, count: usize) -> Result<()> {
        ensure!(
            count <= self.remaining(),
            UnexpectedEndOfStreamSnafu {
                offset: self.pos,
                needed: count - self.remaining(),
            }
        );
        Ok(())
    }
}

/// Decodes up to 4 bytes as an unsigned little-endian integer, accumulating
/// `byte[i] << 8*i`. Longer inputs are rejected instead of truncated.
pub fn decode_uint_le(bytes: &[u8]) -> Result<u32> {
    ensure!(bytes.len() <= 4, IntegerTooWideSnafu { len: bytes.len() });

    Ok(bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, byte)| acc + (u32::from(*byte) << (8 * i))))
}

/// Renders a byte slice as uppercase hex pairs for trace output.
pub fn format_hex(buffer: &[u8]) -> String {
    buffer
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    #[test]
    fn decode_uint_le_is_exact() {
        assert_eq!(decode_uint_le(&[0x10, 0x01]), Ok(272));
        assert_eq!(decode_uint_le(&[0x01, 0x00, 0x00, 0x00]), Ok(1));
        assert_eq!(decode_uint_le(&[]), Ok(0));
        assert_eq!(decode_uint_le(&[0xFF, 0xFF, 0xFF, 0xFF]), Ok(u32::MAX));
    }

    #[test]
    fn decode_uint_le_rejects_wide_input() {
        assert_eq!(
            decode_uint_le(&[0x01, 0x02, 0x03, 0x04, 0x05]),
            Err(FormatError::IntegerTooWide { len: 5 })
        );
    }

    #[test]
    fn read_advances_and_bounds_checks() {
        let mut cursor = Cursor::new(vec![1, 2, 3, 4]);
        assert_eq!(cursor.read(2).unwrap(), &[1, 2]);
        assert_eq!(cursor.position(), 2);
        assert_eq!(
            cursor.read(3),
            Err(FormatError::UnexpectedEndOfStream {
                offset: 2,
                needed: 1
            })
        );
        // a failed read does not move the position
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn seek_to_rejects_out_of_bounds_offsets() {
        let mut cursor = Cursor::new(vec![0; 8]);
        assert!(cursor.seek_to(8).is_ok());
        assert!(cursor.seek_to(9).is_err());
    }

    #[test]
    fn find_forward_only_matches_ahead_of_the_position() {
        let mut cursor = Cursor::new(vec![0xAA, 0xBB, 0x01, 0x02, 0xAA, 0xBB]);
        assert_eq!(cursor.find_forward(&[0x01, 0x02]), Some(2));
        assert_eq!(cursor.position(), 4);
        // the first occurrence is now behind the cursor
        assert_eq!(cursor.find_forward(&[0xAA, 0xBB]), Some(4));
        assert_eq!(cursor.find_forward(&[0xAA, 0xBB]), None);
    }

    #[test]
    fn find_forward_miss_leaves_position_untouched() {
        let mut cursor = Cursor::new(vec![1, 2, 3]);
        cursor.skip(1).unwrap();
        assert_eq!(cursor.find_forward(&[9, 9]), None);
        assert_eq!(cursor.position(), 1);
    }
}
