//! IIIF image request URIs.
//!
//! Builds `{base}/{region}/{size}/0/default.jpg`. Rotation is always 0 and
//! the format always the default one; only region and size vary.

use crate::bbox::{BoxBounds, bounding_box};
use crate::error::GeometryError;
use crate::types::{BoundingBox, Element};

/// Maximum width of a small element thumbnail.
pub const SMALL_THUMBNAIL_WIDTH: u32 = 400;

/// Maximum width of a medium element thumbnail.
pub const MEDIUM_THUMBNAIL_WIDTH: u32 = 800;

/// Build the IIIF URI showing an element, bounded to an optional size.
///
/// The region is `full` when the element has no polygon or its bounding box
/// covers the whole image. The size is `full` when every supplied bound
/// meets or exceeds the source box; when both bounds are supplied only the
/// more restrictive one is emitted, which keeps the aspect ratio.
pub fn iiif_uri(
    element: &Element,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<String, GeometryError> {
    let image = element.valid_image()?;
    let bbox = bounding_box(element, BoxBounds::ImageBounded)?;

    let region = if element.polygon.is_none() || covers(&bbox, &image.bounds()) {
        "full".to_string()
    } else {
        format!(
            "{},{},{},{}",
            bbox.x.round() as i64,
            bbox.y.round() as i64,
            bbox.width.round() as i64,
            bbox.height.round() as i64
        )
    };

    let size = size_clause(&bbox, width, height);

    Ok(format!(
        "{}/{}/{}/0/default.jpg",
        image.url.trim_end_matches('/'),
        region,
        size
    ))
}

/// Whether `bbox` spans the whole of `full` once rounded to pixels.
fn covers(bbox: &BoundingBox, full: &BoundingBox) -> bool {
    let px = |v: f64| v.round() as i64;
    px(bbox.x) == px(full.x)
        && px(bbox.y) == px(full.y)
        && px(bbox.width) == px(full.width)
        && px(bbox.height) == px(full.height)
}

fn size_clause(source: &BoundingBox, width: Option<u32>, height: Option<u32>) -> String {
    let fits_width = width.is_none_or(|w| w as f64 >= source.width);
    let fits_height = height.is_none_or(|h| h as f64 >= source.height);
    if fits_width && fits_height {
        return "full".to_string();
    }

    match (width, height) {
        // Keep the bound with the smallest scale ratio
        (Some(w), Some(h)) if w as f64 * source.height <= h as f64 * source.width => {
            format!("{w},")
        }
        (Some(_), Some(h)) => format!(",{h}"),
        (Some(w), None) => format!("{w},"),
        (None, Some(h)) => format!(",{h}"),
        (None, None) => "full".to_string(),
    }
}

impl Element {
    /// IIIF URI of a thumbnail at most [`SMALL_THUMBNAIL_WIDTH`] wide.
    pub fn small_thumbnail(&self) -> Result<String, GeometryError> {
        iiif_uri(self, Some(SMALL_THUMBNAIL_WIDTH), None)
    }

    /// IIIF URI of a thumbnail at most [`MEDIUM_THUMBNAIL_WIDTH`] wide.
    pub fn medium_thumbnail(&self) -> Result<String, GeometryError> {
        iiif_uri(self, Some(MEDIUM_THUMBNAIL_WIDTH), None)
    }
}
