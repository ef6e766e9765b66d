//! # dicom_reader
//!
//! A small scanner/decoder for DICOM files in the Explicit VR Little Endian
//! transfer syntax (`1.2.840.10008.1.2.1`), extracting a single 16-bit
//! monochrome frame.
//!
//! The pipeline validates the 128-byte preamble and `DICM` magic code,
//! resolves the transfer syntax, then pulls Rows, Columns and Pixel Data by
//! scanning forward through the byte stream for each tag in turn.
//!
//! **Note:** implicit VR, big-endian syntaxes, compressed pixel data and
//! multi-frame images are not supported; such files fail with a typed error
//! rather than a best-effort decode.

pub mod error;
pub mod model;
pub mod service;
pub mod util;

// Re-export the main types for convenience
pub use error::{FormatError, ReadError};
pub use model::{DecodeContext, Element, ImageDescriptor, Tag, Vr, VrLayout};
pub use service::{read_file, to_image, DicomReader, EXPLICIT_VR_LITTLE_ENDIAN};
