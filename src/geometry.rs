use serde::{Deserialize, Serialize};

/// A sampled pen position on the practice canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Perpendicular distance to the infinite line through `start` and `end`.
    ///
    /// Falls back to the distance to `start` when both ends coincide. The
    /// result is not clamped to the segment.
    pub fn perpendicular_distance(&self, start: &Point, end: &Point) -> f64 {
        if start == end {
            return self.distance_to(start);
        }

        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let cross = dx * (start.y - self.y) - (start.x - self.x) * dy;

        cross.abs() / (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Point {
    fn from(v: (f64, f64)) -> Self {
        Point { x: v.0, y: v.1 }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Build a path from coordinate pairs
pub fn path_from<I>(coords: I) -> Vec<Point>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    coords.into_iter().map(Point::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn perpendicular_distance_to_horizontal_line() {
        let p = Point::new(10.0, 5.0);
        let d = p.perpendicular_distance(&Point::new(0.0, 0.0), &Point::new(20.0, 0.0));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn perpendicular_distance_is_not_clamped_to_segment() {
        // beyond the end of the segment, still measured against the line
        let p = Point::new(50.0, 3.0);
        let d = p.perpendicular_distance(&Point::new(0.0, 0.0), &Point::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn perpendicular_distance_with_coincident_ends() {
        let p = Point::new(4.0, 3.0);
        let origin = Point::new(1.0, -1.0);
        assert_eq!(p.perpendicular_distance(&origin, &origin), 5.0);
    }

    #[test]
    fn tuple_conversions() {
        let p: Point = (1.5, -2.0).into();
        assert_eq!(p, Point::new(1.5, -2.0));
        let t: (f64, f64) = p.into();
        assert_eq!(t, (1.5, -2.0));
    }

    #[test]
    fn serializes_as_xy_object() {
        let json = serde_json::to_string(&Point::new(1.0, 2.5)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.5}"#);
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, f64::INFINITY).is_finite());
    }
}
