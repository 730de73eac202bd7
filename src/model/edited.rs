//! The working copy of the polygon being drawn or edited.

use callico_geometry::{Point, Polygon};

use super::RegionId;

/// Polygon under the pointer.
///
/// Drawing produces an uncommitted shape with no id. Editing works on a copy
/// of a stored region and keeps the stored polygon to revert to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditedElement {
    /// A shape being drawn, not yet in the store
    Uncommitted { points: Vec<Point> },
    /// A working copy of a stored region
    Committed {
        id: RegionId,
        points: Vec<Point>,
        original: Polygon,
    },
}

impl EditedElement {
    /// Start editing a stored polygon.
    pub fn committed(id: RegionId, polygon: &Polygon) -> Self {
        Self::Committed {
            id,
            points: polygon.points().to_vec(),
            original: polygon.clone(),
        }
    }

    pub fn points(&self) -> &[Point] {
        match self {
            Self::Uncommitted { points } | Self::Committed { points, .. } => points,
        }
    }

    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        match self {
            Self::Uncommitted { points } | Self::Committed { points, .. } => points,
        }
    }

    pub fn id(&self) -> Option<RegionId> {
        match self {
            Self::Uncommitted { .. } => None,
            Self::Committed { id, .. } => Some(*id),
        }
    }

    pub fn is_uncommitted(&self) -> bool {
        matches!(self, Self::Uncommitted { .. })
    }

    /// Put back the stored polygon. No-op for uncommitted shapes.
    pub fn revert(&mut self) {
        if let Self::Committed {
            points, original, ..
        } = self
        {
            *points = original.points().to_vec();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_restores_original() {
        let polygon = Polygon::from(vec![[0.0, 0.0], [0.0, 5.0], [5.0, 5.0], [0.0, 0.0]]);
        let mut edited = EditedElement::committed(7, &polygon);
        edited.points_mut()[1] = Point::new(3.0, 9.0);
        assert_ne!(edited.points(), polygon.points());

        edited.revert();
        assert_eq!(edited.points(), polygon.points());
        assert_eq!(edited.id(), Some(7));
    }

    #[test]
    fn test_uncommitted_has_no_id() {
        let mut edited = EditedElement::Uncommitted {
            points: vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)],
        };
        edited.revert();
        assert_eq!(edited.id(), None);
        assert!(edited.is_uncommitted());
        assert_eq!(edited.points().len(), 2);
    }
}
