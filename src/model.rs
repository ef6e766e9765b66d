//! Core data types: tags, value representations, decoded elements and the
//! resulting image descriptor.

use std::collections::HashMap;
use std::fmt;
use std::str;

use lazy_static::lazy_static;

/// A DICOM attribute tag: a (group, element) pair, each stored on the wire
/// as a little-endian 16-bit integer.
///
/// Tags are used only as exact-match search keys, never parsed into
/// bitfields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    /// (0002,0010) Transfer Syntax UID.
    pub const TRANSFER_SYNTAX_UID: Tag = Tag::new(0x0002, 0x0010);
    /// (0028,0010) Rows.
    pub const ROWS: Tag = Tag::new(0x0028, 0x0010);
    /// (0028,0011) Columns.
    pub const COLUMNS: Tag = Tag::new(0x0028, 0x0011);
    /// (7FE0,0010) Pixel Data.
    pub const PIXEL_DATA: Tag = Tag::new(0x7FE0, 0x0010);

    pub const fn new(group: u16, element: u16) -> Self {
        Tag { group, element }
    }

    /// The 4-byte pattern this tag has on an Explicit VR Little Endian
    /// stream, used as the search key by the element locator.
    pub fn wire_pattern(self) -> [u8; 4] {
        let g = self.group.to_le_bytes();
        let e = self.element.to_le_bytes();
        [g[0], g[1], e[0], e[1]]
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

/// The two explicit-VR length layouts (PS3.5 table 7.1-1 / 7.1-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrLayout {
    /// 2-byte value length immediately after the VR code.
    Short,
    /// 2 reserved bytes, then a 4-byte value length.
    Long,
}

lazy_static! {
    /// Layout per VR code of the PS3.5 repertoire. Codes absent from the
    /// table use the short form, the explicit-VR default.
    static ref VR_LAYOUTS: HashMap<[u8; 2], VrLayout> = {
        let mut table = HashMap::new();
        for code in [
            b"AE", b"AS", b"AT", b"CS", b"DA", b"DS", b"DT", b"FL", b"FD",
            b"IS", b"LO", b"LT", b"OD", b"PN", b"SH", b"SL", b"SS", b"ST",
            b"TM", b"UI", b"UL", b"US",
        ] {
            table.insert(*code, VrLayout::Short);
        }
        for code in [b"OB", b"OW", b"OF", b"SQ", b"UT", b"UN"] {
            table.insert(*code, VrLayout::Long);
        }
        table
    };
}

/// A 2-character value representation code as found on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vr(pub [u8; 2]);

impl Vr {
    /// Unique Identifier.
    pub const UI: Vr = Vr(*b"UI");
    /// Unsigned Short.
    pub const US: Vr = Vr(*b"US");
    /// Other Word.
    pub const OW: Vr = Vr(*b"OW");

    /// Which of the two explicit-VR length layouts this code decodes with.
    pub fn layout(self) -> VrLayout {
        VR_LAYOUTS.get(&self.0).copied().unwrap_or(VrLayout::Short)
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match str::from_utf8(&self.0) {
            Ok(code) => f.write_str(code),
            Err(_) => write!(f, "{:02X}{:02X}", self.0[0], self.0[1]),
        }
    }
}

impl fmt::Debug for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vr({})", self)
    }
}

/// One decoded data element: tag, VR code and the raw value bytes.
///
/// Elements are transient. The pipeline consumes each value right after
/// extraction and never retains elements as a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub vr: Vr,
    pub value: Vec<u8>,
}

impl Element {
    /// Decoded value length in bytes.
    pub fn length(&self) -> usize {
        self.value.len()
    }
}

/// Byte order and VR explicitness in effect for the stream.
///
/// Initialized to (little-endian, explicit VR) and pinned for the file's
/// lifetime once the transfer syntax resolves; read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    pub little_endian: bool,
    pub explicit_vr: bool,
}

impl Default for DecodeContext {
    fn default() -> Self {
        DecodeContext {
            little_endian: true,
            explicit_vr: true,
        }
    }
}

/// The decoded frame: dimensions plus the raw pixel bytes, row-major, each
/// sample an unsigned 16-bit little-endian integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub rows: u32,
    pub columns: u32,
    pub bytes_per_pixel: usize,
    pub pixel_data: Vec<u8>,
}

impl ImageDescriptor {
    /// The pixel data as 16-bit samples.
    pub fn samples(&self) -> Vec<u16> {
        self.pixel_data
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_wire_pattern_is_little_endian_per_field() {
        assert_eq!(
            Tag::TRANSFER_SYNTAX_UID.wire_pattern(),
            [0x02, 0x00, 0x10, 0x00]
        );
        assert_eq!(Tag::PIXEL_DATA.wire_pattern(), [0xE0, 0x7F, 0x10, 0x00]);
    }

    #[test]
    fn tag_display_is_hex_pair() {
        assert_eq!(Tag::new(0x7FE0, 0x0010).to_string(), "(7FE0,0010)");
    }

    #[test]
    fn long_form_vrs_classify_as_long() {
        for code in [b"OB", b"OW", b"OF", b"SQ", b"UT", b"UN"] {
            assert_eq!(Vr(*code).layout(), VrLayout::Long, "{}", Vr(*code));
        }
    }

    #[test]
    fn short_form_vrs_classify_as_short() {
        for code in [b"US", b"UI", b"UL", b"DS", b"PN"] {
            assert_eq!(Vr(*code).layout(), VrLayout::Short, "{}", Vr(*code));
        }
    }

    #[test]
    fn unknown_vr_defaults_to_short() {
        assert_eq!(Vr(*b"ZZ").layout(), VrLayout::Short);
    }

    #[test]
    fn samples_decode_little_endian_pairs() {
        let descriptor = ImageDescriptor {
            rows: 1,
            columns: 2,
            bytes_per_pixel: 2,
            pixel_data: vec![0x10, 0x01, 0xFF, 0x00],
        };
        assert_eq!(descriptor.samples(), vec![272, 255]);
    }
}
