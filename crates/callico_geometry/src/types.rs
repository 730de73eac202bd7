//! Core geometry value types.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

// ============================================================================
// Point
// ============================================================================

/// A point in image pixel space.
///
/// Serialized as a `[x, y]` pair, the format used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Offset this point by a vector.
    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Bounding Box
// ============================================================================

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left corner X coordinate
    pub x: f64,
    /// Top-left corner Y coordinate
    pub y: f64,
    /// Width of the box
    pub width: f64,
    /// Height of the box
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every point, `None` for an empty slice.
    pub fn of_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Clamp a point so it lies inside the box.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.x, self.right().max(self.x)),
            point.y.clamp(self.y, self.bottom().max(self.y)),
        )
    }

    /// Size of the box once rotated by a multiple of 90 degrees.
    pub fn rotated_size(&self, angle: i32) -> (f64, f64) {
        if angle.rem_euclid(180) == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

// ============================================================================
// Polygon
// ============================================================================

/// An ordered list of vertices.
///
/// A `Polygon` returned by [`check_polygon`](crate::check_polygon) is
/// normalized: integer coordinates, no consecutive duplicates, and within
/// the point count and size limits. Polygons deserialized from the host are
/// not checked until they pass through that function.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the last vertex repeats the first one.
    pub fn is_closed(&self) -> bool {
        self.0.len() > 1 && self.0.first() == self.0.last()
    }

    /// Get the bounding box of the polygon.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of_points(&self.0)
    }

    /// Check if a point is inside the polygon (ray casting algorithm).
    pub fn contains(&self, point: &Point) -> bool {
        let vertices = &self.0;
        if vertices.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let vi = vertices[i];
            let vj = vertices[j];
            if ((vi.y > point.y) != (vj.y > point.y))
                && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl From<Vec<[f64; 2]>> for Polygon {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self(points.into_iter().map(Point::from).collect())
    }
}

// ============================================================================
// Image and Element
// ============================================================================

/// A raster image served through IIIF.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub url: String,
}

impl Image {
    pub fn new(width: u32, height: u32, url: impl Into<String>) -> Self {
        Self {
            width,
            height,
            url: url.into(),
        }
    }

    /// Ensure the image can back geometry computations.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.width == 0 || self.height == 0 {
            return Err(GeometryError::InvalidImageDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.url.trim().is_empty() {
            return Err(GeometryError::MissingImageUrl);
        }
        Ok(())
    }

    /// Box covering the whole image.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

/// Closed polygon covering a whole image, starting at the origin.
pub fn full_polygon(image: &Image) -> Polygon {
    let (w, h) = (image.width as f64, image.height as f64);
    Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
        Point::new(w, 0.0),
        Point::new(0.0, 0.0),
    ])
}

/// The annotated unit being displayed.
///
/// Supplied by the host as a snapshot and replaced wholesale on update.
/// An element without a polygon covers its whole image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub polygon: Option<Polygon>,
    #[serde(default)]
    pub image: Option<Image>,
}

impl Element {
    pub fn new(id: impl Into<String>, image: Image) -> Self {
        Self {
            id: id.into(),
            polygon: None,
            image: Some(image),
        }
    }

    pub fn with_polygon(mut self, polygon: impl Into<Polygon>) -> Self {
        self.polygon = Some(polygon.into());
        self
    }

    /// The element's valid image, or the reason it has none.
    pub fn valid_image(&self) -> Result<&Image, GeometryError> {
        let image = self.image.as_ref().ok_or(GeometryError::MissingImage)?;
        image.validate()?;
        Ok(image)
    }
}
