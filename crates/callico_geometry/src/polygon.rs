//! Polygon validation and normalization.
//!
//! Every polygon accepted into a region list goes through [`check_polygon`].
//! Self-intersection is deliberately not checked here; the backend decides.

use thiserror::Error;

use crate::types::{BoundingBox, Point, Polygon};

/// Default minimum width and height of a polygon, in pixels.
pub const DEFAULT_MIN_POLYGON_SIZE: f64 = 2.0;

/// Maximum number of distinct vertices in a polygon.
///
/// One more point is accepted when it repeats the first one.
pub const MAX_POLYGON_POINTS: usize = 163;

/// Minimum number of distinct vertices in a polygon.
const MIN_POLYGON_POINTS: usize = 3;

/// Why a polygon was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolygonError {
    /// A coordinate is NaN or infinite
    #[error("Point {index} is not a pair of finite numbers")]
    NonFinitePoint {
        /// Position of the offending point in the input
        index: usize,
    },

    /// A coordinate is below zero after rounding
    #[error("Point {index} has a negative coordinate")]
    NegativeCoordinate {
        /// Position of the offending point in the input
        index: usize,
    },

    /// Fewer than three distinct points remain
    #[error("Polygon needs at least 3 distinct points, got {count}")]
    TooFewPoints {
        /// Distinct points found
        count: usize,
    },

    /// More distinct points than allowed
    #[error("Polygon has {count} distinct points, at most {max} are allowed")]
    TooManyPoints {
        /// Distinct points found
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// Bounding box is narrower or shorter than the minimum size
    #[error("Polygon is {width}x{height}, minimum size is {min_size}")]
    TooSmall {
        /// Bounding box width
        width: f64,
        /// Bounding box height
        height: f64,
        /// Configured minimum
        min_size: f64,
    },
}

/// Limits applied by [`check_polygon_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonRules {
    /// Minimum bounding box width and height
    pub min_size: f64,
    /// Maximum distinct vertices
    pub max_points: usize,
}

impl Default for PolygonRules {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_POLYGON_SIZE,
            max_points: MAX_POLYGON_POINTS,
        }
    }
}

impl PolygonRules {
    pub fn with_min_size(min_size: f64) -> Self {
        Self {
            min_size,
            ..Self::default()
        }
    }
}

/// Validate and normalize a polygon with the default point limit.
pub fn check_polygon(points: &[Point], min_size: f64) -> Result<Polygon, PolygonError> {
    check_polygon_with(points, &PolygonRules::with_min_size(min_size))
}

/// Validate and normalize a polygon.
///
/// Coordinates are rounded to integers and consecutive duplicates removed.
/// The result is a new polygon; the input is left untouched. Applying this
/// function to its own output returns the same polygon.
pub fn check_polygon_with(points: &[Point], rules: &PolygonRules) -> Result<Polygon, PolygonError> {
    let mut normalized: Vec<Point> = Vec::with_capacity(points.len());

    for (index, point) in points.iter().enumerate() {
        if !point.is_finite() {
            return Err(PolygonError::NonFinitePoint { index });
        }
        let rounded = Point::new(round_coordinate(point.x), round_coordinate(point.y));
        if rounded.x < 0.0 || rounded.y < 0.0 {
            return Err(PolygonError::NegativeCoordinate { index });
        }
        if normalized.last() != Some(&rounded) {
            normalized.push(rounded);
        }
    }

    let closed = normalized.len() > 1 && normalized.first() == normalized.last();
    let distinct = if closed {
        normalized.len() - 1
    } else {
        normalized.len()
    };

    if distinct < MIN_POLYGON_POINTS {
        return Err(PolygonError::TooFewPoints { count: distinct });
    }
    if distinct > rules.max_points {
        return Err(PolygonError::TooManyPoints {
            count: distinct,
            max: rules.max_points,
        });
    }

    let bbox = BoundingBox::of_points(&normalized).unwrap_or_default();
    if bbox.width < rules.min_size || bbox.height < rules.min_size {
        return Err(PolygonError::TooSmall {
            width: bbox.width,
            height: bbox.height,
            min_size: rules.min_size,
        });
    }

    Ok(Polygon::new(normalized))
}

/// Round to the nearest integer, folding `-0.0` into `0.0`.
fn round_coordinate(value: f64) -> f64 {
    let rounded = value.round();
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Structural equality once both polygons are normalized.
///
/// A polygon that fails validation is never equal to anything.
pub fn polygons_equal(p1: &[Point], p2: &[Point], rules: &PolygonRules) -> bool {
    match (check_polygon_with(p1, rules), check_polygon_with(p2, rules)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[[f64; 2]]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn test_valid_polygon_is_rounded() {
        let poly = check_polygon(&pts(&[[0.4, 0.0], [10.6, 0.0], [10.0, 9.5]]), 2.0).unwrap();
        assert_eq!(poly.points(), pts(&[[0.0, 0.0], [11.0, 0.0], [10.0, 10.0]]).as_slice());
    }

    #[test]
    fn test_check_is_idempotent() {
        let input = pts(&[[1.2, 1.0], [1.0, 1.0], [30.0, 1.0], [30.0, 30.0], [1.0, 30.0], [1.0, 1.0]]);
        let once = check_polygon(&input, 2.0).unwrap();
        let twice = check_polygon(once.points(), 2.0).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_consecutive_duplicates_removed() {
        let input = pts(&[[0.0, 0.0], [0.0, 0.0], [10.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        let poly = check_polygon(&input, 2.0).unwrap();
        assert_eq!(poly.len(), 3);
        assert!(poly.points().windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_two_points_rejected() {
        let err = check_polygon(&pts(&[[0.0, 0.0], [5.0, 5.0]]), 2.0).unwrap_err();
        assert_eq!(err, PolygonError::TooFewPoints { count: 2 });
    }

    #[test]
    fn test_closing_point_not_counted() {
        let err = check_polygon(&pts(&[[0.0, 0.0], [5.0, 5.0], [0.0, 0.0]]), 2.0).unwrap_err();
        assert_eq!(err, PolygonError::TooFewPoints { count: 2 });
    }

    fn circle(count: usize) -> Vec<Point> {
        (0..count)
            .map(|i| {
                let angle = i as f64 / count as f64 * std::f64::consts::TAU;
                Point::new(1000.0 + 900.0 * angle.cos(), 1000.0 + 900.0 * angle.sin())
            })
            .collect()
    }

    #[test]
    fn test_point_limit() {
        assert!(check_polygon(&circle(163), 2.0).is_ok());

        let mut closed = circle(163);
        closed.push(closed[0]);
        assert!(check_polygon(&closed, 2.0).is_ok());

        assert_eq!(
            check_polygon(&circle(165), 2.0).unwrap_err(),
            PolygonError::TooManyPoints { count: 165, max: 163 }
        );
    }

    #[test]
    fn test_too_small_rejected() {
        let input = pts(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert!(matches!(
            check_polygon(&input, 2.0),
            Err(PolygonError::TooSmall { .. })
        ));
        assert!(check_polygon(&input, 1.0).is_ok());
    }

    #[test]
    fn test_nan_rejected() {
        let input = pts(&[[0.0, 0.0], [f64::NAN, 10.0], [10.0, 10.0]]);
        assert_eq!(
            check_polygon(&input, 2.0).unwrap_err(),
            PolygonError::NonFinitePoint { index: 1 }
        );
    }

    #[test]
    fn test_negative_rejected() {
        let input = pts(&[[0.0, 0.0], [-3.0, 10.0], [10.0, 10.0]]);
        assert_eq!(
            check_polygon(&input, 2.0).unwrap_err(),
            PolygonError::NegativeCoordinate { index: 1 }
        );
        // Rounds to zero, so accepted
        let input = pts(&[[-0.2, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        assert!(check_polygon(&input, 2.0).is_ok());
    }

    #[test]
    fn test_polygons_equal_after_normalization() {
        let rules = PolygonRules::default();
        let a = pts(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        let b = pts(&[[0.2, 0.1], [10.0, 0.0], [10.0, 0.0], [9.8, 10.3]]);
        assert!(polygons_equal(&a, &b, &rules));

        let c = pts(&[[0.0, 0.0], [12.0, 0.0], [10.0, 10.0]]);
        assert!(!polygons_equal(&a, &c, &rules));

        let invalid = pts(&[[0.0, 0.0], [1.0, 1.0]]);
        assert!(!polygons_equal(&invalid, &invalid, &rules));
    }
}
