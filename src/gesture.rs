//! Gesture state machine types and the geometry helpers behind them.
//!
//! At most one pointer gesture runs at a time. Zoom transitions are not a
//! gesture: they run alongside whatever the pointer is doing.

use callico_geometry::{BoundingBox, Point};
use serde::{Deserialize, Serialize};

/// What the annotator lets the user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Read-only: pan and zoom
    #[default]
    Display,
    /// Click regions to toggle their selection
    Select,
    /// Draw and edit regions with the active tool
    Create,
}

/// Active tool in create mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Rectangle,
    Polygon,
    Edit,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Rectangle => "Rectangle",
            Tool::Polygon => "Polygon",
            Tool::Edit => "Edit",
        }
    }
}

/// The pointer gesture in progress.
///
/// Positions are in image space except for panning, which works in screen
/// pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Dragging the view
    Panning {
        origin: Point,
        last: Point,
        /// Travelled far enough not to count as a click
        moved: bool,
    },
    /// Rubber-banding a rectangle from its fixed corner
    DrawingRectangle { anchor: Point },
    /// Placing polygon vertices, the last point follows the pointer
    DrawingPolygon,
    /// Moving one vertex of the edited region
    DraggingVertex {
        index: usize,
        start: Point,
        vertex: Point,
    },
    /// Moving the whole edited region
    DraggingPolygon { start: Point, base: Vec<Point> },
}

impl Gesture {
    /// Whether the gesture needs the primary button held.
    pub fn holds_pointer(&self) -> bool {
        !matches!(self, Gesture::Idle | Gesture::DrawingPolygon)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Panning { .. } => "panning",
            Gesture::DrawingRectangle { .. } => "drawing-rectangle",
            Gesture::DrawingPolygon => "drawing-polygon",
            Gesture::DraggingVertex { .. } => "dragging-vertex",
            Gesture::DraggingPolygon { .. } => "dragging-polygon",
        }
    }
}

// ============================================================================
// Geometry helpers
// ============================================================================

/// Closed axis-aligned rectangle through two corners.
pub fn rectangle_points(a: Point, b: Point) -> Vec<Point> {
    vec![
        a,
        Point::new(a.x, b.y),
        b,
        Point::new(b.x, a.y),
        a,
    ]
}

/// Move one vertex, keeping a closed ring closed.
pub fn move_vertex(points: &mut [Point], index: usize, to: Point) {
    let last = points.len().saturating_sub(1);
    let closed = last > 0 && points[0] == points[last];
    if let Some(vertex) = points.get_mut(index) {
        *vertex = to;
    }
    if closed {
        if index == 0 {
            points[last] = to;
        } else if index == last {
            points[0] = to;
        }
    }
}

/// Translate every point, or `None` when a point would leave `bounds`.
pub fn translate_within(points: &[Point], dx: f64, dy: f64, bounds: &BoundingBox) -> Option<Vec<Point>> {
    let moved: Vec<Point> = points.iter().map(|p| p.offset(dx, dy)).collect();
    moved.iter().all(|p| bounds.contains(p)).then_some(moved)
}

/// Index of the vertex closest to `point` within `radius`.
pub fn vertex_at(points: &[Point], point: Point, radius: f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.distance_to(&point)))
        .filter(|(_, distance)| *distance <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_points_are_closed() {
        let points = rectangle_points(Point::new(10.0, 10.0), Point::new(60.0, 40.0));
        assert_eq!(points.len(), 5);
        assert_eq!(points.first(), points.last());
        assert_eq!(points[2], Point::new(60.0, 40.0));
    }

    #[test]
    fn test_move_vertex_mirrors_ring_endpoints() {
        let mut points = rectangle_points(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        move_vertex(&mut points, 0, Point::new(1.0, 2.0));
        assert_eq!(points[4], Point::new(1.0, 2.0));

        move_vertex(&mut points, 4, Point::new(3.0, 3.0));
        assert_eq!(points[0], Point::new(3.0, 3.0));

        move_vertex(&mut points, 2, Point::new(8.0, 9.0));
        assert_eq!(points[2], Point::new(8.0, 9.0));
        assert_eq!(points[0], Point::new(3.0, 3.0));
    }

    #[test]
    fn test_translate_within_rejects_escape() {
        let bounds = BoundingBox::new(0.0, 0.0, 20.0, 20.0);
        let points = rectangle_points(Point::new(5.0, 5.0), Point::new(10.0, 10.0));
        let moved = translate_within(&points, 5.0, 5.0, &bounds).unwrap();
        assert_eq!(moved[0], Point::new(10.0, 10.0));
        assert!(translate_within(&points, 11.0, 0.0, &bounds).is_none());
    }

    #[test]
    fn test_vertex_at_picks_closest() {
        let points = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(20.0, 0.0)];
        assert_eq!(vertex_at(&points, Point::new(3.0, 0.0), 5.0), Some(1));
        assert_eq!(vertex_at(&points, Point::new(12.0, 0.0), 5.0), None);
    }

    #[test]
    fn test_polygon_drawing_does_not_hold_pointer() {
        assert!(!Gesture::DrawingPolygon.holds_pointer());
        assert!(Gesture::DrawingRectangle { anchor: Point::default() }.holds_pointer());
        assert_eq!(Gesture::default(), Gesture::Idle);
    }
}
