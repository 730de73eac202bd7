//! Error types for geometry operations.

use thiserror::Error;

use crate::polygon::PolygonError;

/// Errors raised when an element cannot back a geometry computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The element has no image attached
    #[error("Element has no image")]
    MissingImage,

    /// The image dimensions are not positive integers
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidImageDimensions {
        /// Declared width
        width: u32,
        /// Declared height
        height: u32,
    },

    /// The image has no URL to request it from
    #[error("Image URL is missing")]
    MissingImageUrl,

    /// The polygon failed validation
    #[error(transparent)]
    Polygon(#[from] PolygonError),
}
