//! Point rotation and 2D affine matrices.

use crate::types::Point;

/// Sine and cosine of an angle in degrees, exact on quarter turns.
fn sin_cos_degrees(angle: f64) -> (f64, f64) {
    let normalized = angle.rem_euclid(360.0);
    if normalized == 0.0 {
        (0.0, 1.0)
    } else if normalized == 90.0 {
        (1.0, 0.0)
    } else if normalized == 180.0 {
        (0.0, -1.0)
    } else if normalized == 270.0 {
        (-1.0, 0.0)
    } else {
        normalized.to_radians().sin_cos()
    }
}

/// Rotate a point clockwise (y axis pointing down) around an origin.
///
/// An angle of zero returns the input unchanged.
pub fn rotate_around(point: Point, origin: Point, angle: f64) -> Point {
    if angle == 0.0 {
        return point;
    }
    let (sin, cos) = sin_cos_degrees(angle);
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    Point::new(
        origin.x + dx * cos - dy * sin,
        origin.y + dx * sin + dy * cos,
    )
}

/// A 2D affine matrix in SVG order.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub const fn translate(dx: f64, dy: f64) -> Self {
        Self {
            e: dx,
            f: dy,
            ..Self::identity()
        }
    }

    pub const fn scale(factor: f64) -> Self {
        Self {
            a: factor,
            d: factor,
            ..Self::identity()
        }
    }

    /// Clockwise rotation around the origin, in degrees.
    pub fn rotate(angle: f64) -> Self {
        let (sin, cos) = sin_cos_degrees(angle);
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Affine) -> Affine {
        Affine {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    /// The inverse matrix, `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Affine {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    /// Apply only the linear part, for vectors.
    pub fn apply_vector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.a * dx + self.c * dy, self.b * dx + self.d * dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
    }

    #[test]
    fn test_zero_angle_is_identity() {
        let p = Point::new(0.1 + 0.2, 7.0);
        assert_eq!(rotate_around(p, Point::new(3.0, 3.0), 0.0), p);
    }

    #[test]
    fn test_quarter_turn_is_clockwise() {
        let rotated = rotate_around(Point::new(2.0, 0.0), Point::new(0.0, 0.0), 90.0);
        assert_eq!(rotated, Point::new(0.0, 2.0));
        let back = rotate_around(rotated, Point::new(0.0, 0.0), -90.0);
        assert_eq!(back, Point::new(2.0, 0.0));
    }

    #[test]
    fn test_rotation_around_origin_point() {
        let rotated = rotate_around(Point::new(20.0, 10.0), Point::new(10.0, 10.0), 180.0);
        assert_eq!(rotated, Point::new(0.0, 10.0));
    }

    #[test]
    fn test_affine_composition_order() {
        // Scale first, then translate
        let m = Affine::scale(2.0).then(&Affine::translate(10.0, 5.0));
        assert!(approx_eq(m.apply(Point::new(1.0, 1.0)), Point::new(12.0, 7.0)));
    }

    #[test]
    fn test_affine_inverse_roundtrip() {
        let m = Affine::translate(-4.0, 9.0)
            .then(&Affine::scale(1.5))
            .then(&Affine::rotate(270.0))
            .then(&Affine::translate(100.0, 50.0));
        let inv = m.invert().unwrap();
        let p = Point::new(13.0, -2.5);
        assert!(approx_eq(inv.apply(m.apply(p)), p));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        assert!(Affine::scale(0.0).invert().is_none());
    }
}
