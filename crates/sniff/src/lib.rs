//! Media type detection from file content.
//!
//! Remote images are frequently served from URLs without an extension, or
//! with one that lies, so the file extension used for the local copy is
//! derived from the fetched bytes alone. [`MediaType::from_magic_bytes`]
//! checks a fixed table of signatures; generic XML gets a second look for an
//! SVG document (see [`is_svg`]).
//!
//! ```
//! use mdlocal_sniff::MediaType;
//!
//! let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
//! assert_eq!(MediaType::from_magic_bytes(png), MediaType::Png);
//! assert_eq!(MediaType::from_magic_bytes(png).extension(), "png");
//! ```

mod svg;

pub use crate::svg::is_svg;
use std::fmt;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const GIF87_MAGIC: &[u8; 6] = b"GIF87a";
const GIF89_MAGIC: &[u8; 6] = b"GIF89a";
const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WEBP_MAGIC: &[u8; 4] = b"WEBP";
const BMP_MAGIC: &[u8; 2] = b"BM";
const ICO_MAGIC: [u8; 4] = [0x00, 0x00, 0x01, 0x00];
const TIFF_LE_MAGIC: [u8; 4] = [0x49, 0x49, 0x2A, 0x00];
const TIFF_BE_MAGIC: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A];
const PDF_MAGIC: &[u8; 5] = b"%PDF-";
const FTYP_MAGIC: &[u8; 4] = b"ftyp";
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A media format recognised by its leading bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Ico,
    Tiff,
    Avif,
    Heic,
    Pdf,
    Svg,
    /// Generic XML that is not an SVG document.
    Xml,
    /// Nothing matched. Its [`extension`](Self::extension) is empty.
    #[default]
    Unknown,
}

impl MediaType {
    /// Detect the media type of a buffer.
    ///
    /// Only the content is consulted; URLs and HTTP headers are ignored.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        let detected = Self::from_signature(bytes);
        // XML is only the envelope: look inside for an SVG root element.
        if detected == MediaType::Xml && is_svg(bytes) {
            return MediaType::Svg;
        }
        tracing::trace!(?detected, bytes = bytes.len(), "Sniffed media type");
        detected
    }

    fn from_signature(bytes: &[u8]) -> Self {
        if bytes.starts_with(&PNG_MAGIC) {
            return MediaType::Png;
        }
        if bytes.starts_with(&JPEG_MAGIC) {
            return MediaType::Jpeg;
        }
        if bytes.starts_with(GIF87_MAGIC) || bytes.starts_with(GIF89_MAGIC) {
            return MediaType::Gif;
        }
        if bytes.len() >= 12 && bytes.starts_with(RIFF_MAGIC) && &bytes[8..12] == WEBP_MAGIC {
            return MediaType::Webp;
        }
        if bytes.starts_with(&TIFF_LE_MAGIC) || bytes.starts_with(&TIFF_BE_MAGIC) {
            return MediaType::Tiff;
        }
        if bytes.starts_with(&ICO_MAGIC) {
            return MediaType::Ico;
        }
        if bytes.starts_with(PDF_MAGIC) {
            return MediaType::Pdf;
        }
        if bytes.len() >= 12 && &bytes[4..8] == FTYP_MAGIC {
            match &bytes[8..12] {
                b"avif" | b"avis" => return MediaType::Avif,
                b"heic" | b"heix" | b"hevc" | b"hevx" => return MediaType::Heic,
                _ => {},
            }
        }
        // Two bytes is a weak signature; check it after everything longer.
        if bytes.len() >= 14 && bytes.starts_with(BMP_MAGIC) {
            return MediaType::Bmp;
        }
        if svg::looks_like_xml(bytes) {
            return MediaType::Xml;
        }
        MediaType::Unknown
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
            MediaType::Gif => "gif",
            MediaType::Webp => "webp",
            MediaType::Bmp => "bmp",
            MediaType::Ico => "ico",
            MediaType::Tiff => "tif",
            MediaType::Avif => "avif",
            MediaType::Heic => "heic",
            MediaType::Pdf => "pdf",
            MediaType::Svg => "svg",
            MediaType::Xml => "xml",
            MediaType::Unknown => "",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, MediaType::Unknown)
    }
}
impl From<&[u8]> for MediaType {
    fn from(value: &[u8]) -> Self {
        MediaType::from_magic_bytes(value)
    }
}
impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Unknown => f.write_str("unknown"),
            known => f.write_str(known.extension()),
        }
    }
}

/// Strip a UTF-8 byte order mark and leading ASCII whitespace.
pub(crate) fn trim_start(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    &bytes[start..]
}
