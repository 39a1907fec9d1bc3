use base64::Engine as _;
use serde::{Serialize, Serializer};

use crate::cell_ref::CellRef;

/// A cell corner plus an offset inside that cell, in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    pub cell: CellRef,
    pub col_offset: i64,
    pub row_offset: i64,
}

/// Where a picture or chart sits on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Anchor {
    /// Moves and resizes with both corner cells.
    TwoCell { from: AnchorPoint, to: AnchorPoint },
    /// Pinned to one cell with a fixed extent in EMUs.
    OneCell {
        from: AnchorPoint,
        width: i64,
        height: i64,
    },
    /// Absolute position and extent in EMUs.
    Absolute {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
}

impl Anchor {
    /// The top-left cell, for anchors tied to cells.
    pub fn top_left(&self) -> Option<CellRef> {
        match self {
            Self::TwoCell { from, .. } | Self::OneCell { from, .. } => Some(from.cell),
            Self::Absolute { .. } => None,
        }
    }
}

/// Image format/MIME type detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Emf,
    Wmf,
    Unknown,
}

impl ImageFormat {
    /// Detect image format from file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" | "dib" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "emf" => Self::Emf,
            "wmf" => Self::Wmf,
            _ => Self::Unknown,
        }
    }

    /// Detect image format from magic bytes
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Self::Gif;
        }
        if data.starts_with(b"BM") {
            return Self::Bmp;
        }
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Self::Tiff;
        }
        if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP") {
            return Self::Webp;
        }
        // EMF header record type 1, with " EMF" signature at offset 40.
        if data.starts_with(&[0x01, 0x00, 0x00, 0x00]) && data.get(40..44) == Some(b" EMF") {
            return Self::Emf;
        }
        // Placeable WMF key.
        if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
            return Self::Wmf;
        }
        Self::Unknown
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Webp => "image/webp",
            Self::Emf => "image/x-emf",
            Self::Wmf => "image/x-wmf",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Image bytes, or a placeholder when the payload exceeded the size ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImagePayload {
    /// Verbatim source bytes. Serialized as standard base64.
    Inline {
        #[serde(serialize_with = "serialize_base64")]
        data: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Placeholder { original_size: usize },
}

impl ImagePayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Inline { data } => data.len(),
            Self::Placeholder { original_size } => *original_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Inline { data } => Some(data),
            Self::Placeholder { .. } => None,
        }
    }
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub anchor: Anchor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub format: ImageFormat,
    pub mime_type: String,
    pub payload: ImagePayload,
}
