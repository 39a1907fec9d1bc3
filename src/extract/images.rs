//! Embedded picture extraction.

use crate::source::{PictureNode, ShapeNode, SheetNode};
use crate::types::{DiagnosticKind, Diagnostics, Image, ImageFormat, ImagePayload};

/// Pictures in drawing order. Payloads larger than `max_bytes` become
/// placeholders carrying the original size.
pub fn extract(sheet: &SheetNode, max_bytes: usize, diags: &mut Diagnostics) -> Vec<Image> {
    sheet
        .shapes
        .iter()
        .filter_map(|shape| match shape {
            ShapeNode::Picture(picture) => image(picture, max_bytes, diags),
            ShapeNode::Chart(_) => None,
        })
        .collect()
}

fn image(picture: &PictureNode, max_bytes: usize, diags: &mut Diagnostics) -> Option<Image> {
    let location = picture
        .name
        .clone()
        .or_else(|| picture.anchor.top_left().map(|c| c.to_string()));

    let Some(data) = picture.data.as_ref() else {
        if let Some(size) = picture.declared_size {
            return Some(unloaded(picture, size, max_bytes, location, diags));
        }
        diags.warn(
            DiagnosticKind::MissingImageData,
            location,
            format!(
                "image target {} not found in container",
                picture.source_name.as_deref().unwrap_or("<unnamed>")
            ),
        );
        return None;
    };

    let format = detect_format(data, picture.source_name.as_deref());
    let mime_type = picture
        .content_type
        .clone()
        .unwrap_or_else(|| format.mime_type().to_string());

    let payload = if data.len() > max_bytes {
        diags.warn(
            DiagnosticKind::ImageTooLarge,
            location,
            format!(
                "image is {} bytes, above the {max_bytes} byte limit",
                data.len()
            ),
        );
        ImagePayload::Placeholder {
            original_size: data.len(),
        }
    } else {
        ImagePayload::Inline { data: data.clone() }
    };

    Some(Image {
        anchor: picture.anchor,
        name: picture.name.clone(),
        description: picture.description.clone(),
        format,
        mime_type,
        payload,
    })
}

/// A payload the reader left in the container for exceeding the limit.
fn unloaded(
    picture: &PictureNode,
    size: usize,
    max_bytes: usize,
    location: Option<String>,
    diags: &mut Diagnostics,
) -> Image {
    diags.warn(
        DiagnosticKind::ImageTooLarge,
        location,
        format!("image is {size} bytes, above the {max_bytes} byte limit"),
    );
    let format = detect_format(&[], picture.source_name.as_deref());
    Image {
        anchor: picture.anchor,
        name: picture.name.clone(),
        description: picture.description.clone(),
        format,
        mime_type: picture
            .content_type
            .clone()
            .unwrap_or_else(|| format.mime_type().to_string()),
        payload: ImagePayload::Placeholder {
            original_size: size,
        },
    }
}

/// Magic bytes first, then the file extension.
fn detect_format(data: &[u8], source_name: Option<&str>) -> ImageFormat {
    match ImageFormat::from_magic_bytes(data) {
        ImageFormat::Unknown => source_name
            .and_then(|name| name.rsplit_once('.'))
            .map_or(ImageFormat::Unknown, |(_, ext)| {
                ImageFormat::from_extension(ext)
            }),
        format => format,
    }
}
