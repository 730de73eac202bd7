//! Element bounding boxes.

use crate::error::GeometryError;
use crate::polygon::PolygonError;
use crate::types::{BoundingBox, Element, full_polygon};

/// Whether a bounding box is clamped to the element's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxBounds {
    /// Clamp every corner to `[0, width] x [0, height]`
    #[default]
    ImageBounded,
    /// Keep the raw extent, which may be negative or exceed the image
    Unbounded,
}

/// Compute the bounding box of an element.
///
/// Uses the element polygon, or the whole image when it has none. An
/// image-bounded box requires a valid image; an unbounded box only needs
/// one when the element has no polygon.
pub fn bounding_box(element: &Element, bounds: BoxBounds) -> Result<BoundingBox, GeometryError> {
    let raw = match &element.polygon {
        Some(polygon) => polygon
            .bounding_box()
            .ok_or(GeometryError::Polygon(PolygonError::TooFewPoints { count: 0 }))?,
        None => full_polygon(element.valid_image()?)
            .bounding_box()
            .unwrap_or_default(),
    };

    match bounds {
        BoxBounds::Unbounded => Ok(raw),
        BoxBounds::ImageBounded => {
            let image = element.valid_image()?;
            let (w, h) = (image.width as f64, image.height as f64);
            let x1 = raw.x.clamp(0.0, w);
            let y1 = raw.y.clamp(0.0, h);
            let x2 = raw.right().clamp(0.0, w);
            let y2 = raw.bottom().clamp(0.0, h);
            Ok(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Image, Polygon};

    fn image(width: u32, height: u32) -> Image {
        Image::new(width, height, "http://x/img")
    }

    #[test]
    fn test_bounded_box_is_clamped() {
        let element = Element::new("e", image(40, 40))
            .with_polygon(vec![[10.0, 10.0], [50.0, 10.0], [50.0, 50.0], [10.0, 50.0]]);
        let bbox = bounding_box(&element, BoxBounds::ImageBounded).unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn test_unbounded_box_keeps_extent() {
        let element = Element::new("e", image(40, 40))
            .with_polygon(vec![[-10.0, 10.0], [50.0, 10.0], [50.0, 50.0]]);
        let bbox = bounding_box(&element, BoxBounds::Unbounded).unwrap();
        assert_eq!(bbox, BoundingBox::new(-10.0, 10.0, 60.0, 40.0));
    }

    #[test]
    fn test_whole_image_without_polygon() {
        let element = Element::new("e", image(120, 80));
        let bbox = bounding_box(&element, BoxBounds::default()).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 120.0, 80.0));
    }

    #[test]
    fn test_bounded_box_requires_image() {
        let element = Element {
            polygon: Some(Polygon::from(vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]])),
            ..Element::default()
        };
        assert_eq!(
            bounding_box(&element, BoxBounds::ImageBounded),
            Err(GeometryError::MissingImage)
        );
        assert!(bounding_box(&element, BoxBounds::Unbounded).is_ok());
    }

    #[test]
    fn test_invalid_image_rejected() {
        let element = Element::new("e", image(0, 40));
        assert!(matches!(
            bounding_box(&element, BoxBounds::ImageBounded),
            Err(GeometryError::InvalidImageDimensions { .. })
        ));
    }
}
