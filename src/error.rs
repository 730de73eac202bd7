//! Errors raised by the annotator.

use callico_geometry::GeometryError;
use thiserror::Error;

use crate::model::RegionId;

/// Errors from annotator operations.
///
/// Gesture input never fails: invalid drawings are discarded and invalid
/// edits reverted. These errors come from explicit calls with bad
/// arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotatorError {
    /// The element cannot be displayed
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// No live region has this id
    #[error("Unknown region {0}")]
    UnknownRegion(RegionId),

    /// A live region already uses this id
    #[error("Region {0} already exists")]
    DuplicateRegion(RegionId),

    /// Every region id has been handed out
    #[error("No region id left to assign")]
    IdsExhausted,
}
