//! The decode pipeline: preamble validation, element location, transfer
//! syntax resolution and image attribute extraction.

use std::path::Path;

use image::{ImageBuffer, Luma};
use snafu::{ensure, OptionExt};
use tracing::{debug, trace};

use crate::error::{
    BadPreambleSnafu, InconsistentPixelLengthSnafu, ReadError, Result, TagNotFoundSnafu,
    UnexpectedVrSnafu, UnsupportedBitDepthSnafu, UnsupportedTransferSyntaxSnafu,
};
use crate::model::{DecodeContext, Element, ImageDescriptor, Tag, Vr, VrLayout};
use crate::util::{decode_uint_le, format_hex, read_file_bytes, Cursor};

/// Size of the ignored preamble at the start of a DICOM file.
const PREAMBLE_LENGTH: usize = 128;

/// Magic code expected right after the preamble.
const MAGIC_CODE: &[u8; 4] = b"DICM";

/// UID of the one transfer syntax this reader decodes.
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// Pipeline progress. Stages only move forward; any failure is terminal and
/// surfaces as an error, no stage is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Opened,
    PreambleChecked,
    TransferSyntaxResolved,
    DimensionsKnown,
    PixelDataExtracted,
    ImageReady,
}

/// Reads a DICOM file from disk and decodes its single 16-bit monochrome
/// frame.
pub fn read_file(path: impl AsRef<Path>) -> Result<ImageDescriptor, ReadError> {
    let content = read_file_bytes(path.as_ref())?;
    Ok(DicomReader::new(content).decode()?)
}

/// Single-use decoder over an in-memory DICOM byte stream.
///
/// The reader owns its cursor exclusively; `decode` consumes the reader and
/// either yields an [`ImageDescriptor`] or the first error encountered.
#[derive(Debug)]
pub struct DicomReader {
    cursor: Cursor,
    context: DecodeContext,
    stage: Stage,
}

impl DicomReader {
    pub fn new(content: Vec<u8>) -> Self {
        DicomReader {
            cursor: Cursor::new(content),
            context: DecodeContext::default(),
            stage: Stage::Opened,
        }
    }

    /// Byte order and VR explicitness in effect. Fixed to (little-endian,
    /// explicit) once the transfer syntax resolves.
    pub fn context(&self) -> DecodeContext {
        self.context
    }

    /// Runs the full pipeline: preamble, transfer syntax, rows, columns,
    /// pixel data, consistency checks.
    pub fn decode(mut self) -> Result<ImageDescriptor> {
        self.check_preamble()?;
        self.resolve_transfer_syntax()?;

        let rows = self.read_dimension(Tag::ROWS)?;
        let columns = self.read_dimension(Tag::COLUMNS)?;
        self.advance(Stage::DimensionsKnown);
        debug!(rows, columns, "image dimensions known");

        let pixel_data = self.locate_with_vr(Tag::PIXEL_DATA, Vr::OW)?;
        self.advance(Stage::PixelDataExtracted);

        let descriptor = build_descriptor(rows, columns, pixel_data.value)?;
        self.advance(Stage::ImageReady);
        debug!(
            bytes_per_pixel = descriptor.bytes_per_pixel,
            length = descriptor.pixel_data.len(),
            "image ready"
        );
        Ok(descriptor)
    }

    /// Locates the next occurrence of `tag` ahead of the cursor and decodes
    /// the element's VR, length and value.
    ///
    /// The scan is a plain byte-pattern search over the remaining stream,
    /// not a structural walk of well-formed elements: 4 bytes inside some
    /// unrelated element's value that happen to equal the tag pattern match
    /// just the same. Callers rely on the wanted tags appearing in
    /// increasing offset order; a tag whose element lies behind the cursor
    /// is reported as not found.
    pub fn locate(&mut self, tag: Tag) -> Result<Element> {
        self.find_tag(tag)?;
        let vr = self.read_vr()?;
        self.read_element_body(tag, vr)
    }

    /// Like [`locate`](Self::locate), but verifies the VR code on the wire
    /// against `expected` before any length decoding proceeds.
    pub fn locate_with_vr(&mut self, tag: Tag, expected: Vr) -> Result<Element> {
        self.find_tag(tag)?;
        let vr = self.read_vr()?;
        ensure!(
            vr == expected,
            UnexpectedVrSnafu {
                tag,
                expected: expected.to_string(),
                actual: vr.to_string(),
            }
        );
        self.read_element_body(tag, vr)
    }

    fn check_preamble(&mut self) -> Result<()> {
        let magic_ok = self
            .cursor
            .seek_to(PREAMBLE_LENGTH)
            .and_then(|_| self.cursor.read(4))
            .map(|magic| magic == MAGIC_CODE)
            .unwrap_or(false);
        ensure!(magic_ok, BadPreambleSnafu);

        self.advance(Stage::PreambleChecked);
        debug!("preamble checked");
        Ok(())
    }

    fn resolve_transfer_syntax(&mut self) -> Result<()> {
        let element = self.locate_with_vr(Tag::TRANSFER_SYNTAX_UID, Vr::UI)?;

        // UI values are NUL-padded to an even length; the default repertoire
        // is Latin-1.
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&element.value);
        let uid = decoded.trim_end_matches('\0').trim().to_string();
        ensure!(
            uid == EXPLICIT_VR_LITTLE_ENDIAN,
            UnsupportedTransferSyntaxSnafu { uid }
        );

        self.context = DecodeContext {
            little_endian: true,
            explicit_vr: true,
        };
        self.advance(Stage::TransferSyntaxResolved);
        debug!(uid = EXPLICIT_VR_LITTLE_ENDIAN, "transfer syntax resolved");
        Ok(())
    }

    fn read_dimension(&mut self, tag: Tag) -> Result<u32> {
        let element = self.locate_with_vr(tag, Vr::US)?;
        decode_uint_le(&element.value)
    }

    fn find_tag(&mut self, tag: Tag) -> Result<()> {
        let offset = self
            .cursor
            .find_forward(&tag.wire_pattern())
            .context(TagNotFoundSnafu { tag })?;
        trace!(%tag, offset, "tag matched");
        Ok(())
    }

    fn read_vr(&mut self) -> Result<Vr> {
        let bytes = self.cursor.read(2)?;
        Ok(Vr([bytes[0], bytes[1]]))
    }

    fn read_element_body(&mut self, tag: Tag, vr: Vr) -> Result<Element> {
        let length = match vr.layout() {
            VrLayout::Long => {
                // 2 reserved bytes precede the 4-byte length
                self.cursor.skip(2)?;
                decode_uint_le(self.cursor.read(4)?)?
            }
            VrLayout::Short => decode_uint_le(self.cursor.read(2)?)?,
        } as usize;

        let value = self.cursor.read(length)?.to_vec();
        trace!(
            %tag,
            %vr,
            length,
            preview = %format_hex(&value[..value.len().min(16)]),
            "element decoded"
        );
        Ok(Element { tag, vr, value })
    }

    fn advance(&mut self, stage: Stage) {
        debug_assert!(self.stage < stage);
        self.stage = stage;
    }
}

/// Validates pixel-length consistency and assembles the descriptor.
///
/// bytes-per-pixel must divide the pixel data evenly across rows x columns,
/// and only 2 bytes per pixel (a 16-bit monochrome frame) is implemented;
/// anything else fails instead of misinterpreting the buffer.
fn build_descriptor(rows: u32, columns: u32, pixel_data: Vec<u8>) -> Result<ImageDescriptor> {
    let pixel_count = rows as usize * columns as usize;
    let length = pixel_data.len();
    ensure!(
        pixel_count != 0 && length % pixel_count == 0,
        InconsistentPixelLengthSnafu {
            rows,
            columns,
            length
        }
    );

    let bytes_per_pixel = length / pixel_count;
    ensure!(
        bytes_per_pixel == 2,
        UnsupportedBitDepthSnafu { bytes_per_pixel }
    );

    Ok(ImageDescriptor {
        rows,
        columns,
        bytes_per_pixel,
        pixel_data,
    })
}

/// Builds a 16-bit grayscale image buffer from the decoded frame.
pub fn to_image(descriptor: &ImageDescriptor) -> ImageBuffer<Luma<u16>, Vec<u16>> {
    let samples = descriptor.samples();
    let mut img = ImageBuffer::<Luma<u16>, Vec<u16>>::new(descriptor.columns, descriptor.rows);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let index = (y * descriptor.columns + x) as usize;
        *pixel = Luma([samples[index]]);
    }

    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    #[test]
    fn descriptor_accepts_exact_two_byte_pixels() {
        let descriptor = build_descriptor(512, 512, vec![0; 524_288]).unwrap();
        assert_eq!(descriptor.bytes_per_pixel, 2);
    }

    #[test]
    fn descriptor_rejects_inexact_pixel_length() {
        assert_eq!(
            build_descriptor(512, 512, vec![0; 524_287]),
            Err(FormatError::InconsistentPixelLength {
                rows: 512,
                columns: 512,
                length: 524_287
            })
        );
    }

    #[test]
    fn descriptor_rejects_zero_dimensions() {
        assert_eq!(
            build_descriptor(0, 512, vec![0; 1024]),
            Err(FormatError::InconsistentPixelLength {
                rows: 0,
                columns: 512,
                length: 1024
            })
        );
    }

    #[test]
    fn descriptor_rejects_other_bit_depths() {
        assert_eq!(
            build_descriptor(4, 4, vec![0; 16]),
            Err(FormatError::UnsupportedBitDepth { bytes_per_pixel: 1 })
        );
        assert_eq!(
            build_descriptor(4, 4, vec![0; 64]),
            Err(FormatError::UnsupportedBitDepth { bytes_per_pixel: 4 })
        );
    }

    #[test]
    fn to_image_lays_out_samples_row_major() {
        let descriptor = ImageDescriptor {
            rows: 2,
            columns: 2,
            bytes_per_pixel: 2,
            pixel_data: vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00],
        };
        let img = to_image(&descriptor);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0).0, [1]);
        assert_eq!(img.get_pixel(1, 0).0, [2]);
        assert_eq!(img.get_pixel(0, 1).0, [3]);
        assert_eq!(img.get_pixel(1, 1).0, [4]);
    }
}
