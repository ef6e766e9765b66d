//! Error types for the decode pipeline.
//!
//! Every stage fails fast: a malformed or unsupported file yields a typed
//! error, never a best-effort image.

use std::path::PathBuf;

use snafu::Snafu;

use crate::model::Tag;

/// Errors raised when reading a DICOM file from disk.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReadError {
    /// The file could not be opened or read.
    #[snafu(display("could not read DICOM file {}: {}", path.display(), source))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file content could not be decoded.
    #[snafu(transparent)]
    Decode { source: FormatError },
}

/// Errors raised while decoding an in-memory DICOM byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FormatError {
    /// No `DICM` magic code after the 128-byte preamble.
    #[snafu(display("missing `DICM` magic code at offset 128, not a DICOM file"))]
    BadPreamble,

    /// The tag pattern did not occur between the cursor and the end of the
    /// stream.
    #[snafu(display("data element {} not found after the current position", tag))]
    TagNotFound { tag: Tag },

    /// The element carried a different VR code than the one required.
    #[snafu(display("data element {} has VR `{}`, expected `{}`", tag, actual, expected))]
    UnexpectedVr {
        tag: Tag,
        expected: String,
        actual: String,
    },

    /// Any transfer syntax other than Explicit VR Little Endian.
    #[snafu(display(
        "unsupported transfer syntax `{}`, only 1.2.840.10008.1.2.1 (Explicit VR Little Endian) is supported",
        uid
    ))]
    UnsupportedTransferSyntax { uid: String },

    /// Pixel data length is not a whole multiple of rows x columns.
    #[snafu(display(
        "pixel data length {} is not a whole multiple of {} rows x {} columns",
        length,
        rows,
        columns
    ))]
    InconsistentPixelLength {
        rows: u32,
        columns: u32,
        length: usize,
    },

    /// Only 2 bytes per pixel (a single 16-bit monochrome frame) is
    /// implemented.
    #[snafu(display("unsupported bit depth: {} byte(s) per pixel", bytes_per_pixel))]
    UnsupportedBitDepth { bytes_per_pixel: usize },

    /// Little-endian integer decoding is limited to 4 bytes; a wider value
    /// would overflow the accumulator.
    #[snafu(display("cannot decode a {}-byte integer, at most 4 bytes fit", len))]
    IntegerTooWide { len: usize },

    /// A read or seek ran past the end of the stream.
    #[snafu(display("stream ended early: needed {} more byte(s) at offset {}", needed, offset))]
    UnexpectedEndOfStream { offset: usize, needed: usize },
}

pub type Result<T, E = FormatError> = std::result::Result<T, E>;
