//! Callico geometry library.
//!
//! Pure functions and value types shared by the image annotation editor:
//! bounding boxes, polygon validation, point rotation, IIIF URI building and
//! image size consistency checks. Nothing in this crate holds editor state.

mod bbox;
mod error;
mod iiif;
mod image_size;
mod polygon;
mod transform;
mod types;

pub use bbox::{BoxBounds, bounding_box};
pub use error::GeometryError;
pub use iiif::{MEDIUM_THUMBNAIL_WIDTH, SMALL_THUMBNAIL_WIDTH, iiif_uri};
pub use image_size::{DEFAULT_IMAGE_SIZE_TOLERANCE, ImageSizeMismatch, check_image_size};
pub use polygon::{
    DEFAULT_MIN_POLYGON_SIZE, MAX_POLYGON_POINTS, PolygonError, PolygonRules, check_polygon,
    check_polygon_with, polygons_equal,
};
pub use transform::{Affine, rotate_around};
pub use types::{BoundingBox, Element, Image, Point, Polygon, full_polygon};
