//! Single-split Douglas-Peucker reduction of a traced stroke.
//!
//! Every stroke with three or more samples is reduced to exactly three
//! points: the start, one representative interior point and the end. The
//! interior point is the sample that deviates most from the chord between
//! start and end, unless the stroke is effectively straight, in which case
//! the sample at the middle index is used.

use crate::geometry::Point;

/// Deviations below this (in canvas units) count as a straight stroke
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathReducer {
    pub deviation_threshold: f64,
}

impl PathReducer {
    pub fn new() -> Self {
        Self {
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
        }
    }

    pub fn with_threshold(deviation_threshold: f64) -> Self {
        Self {
            deviation_threshold,
        }
    }

    /// Reduce a path to `[start, interior, end]`.
    ///
    /// Paths with fewer than three points are returned unchanged.
    pub fn reduce(&self, path: &[Point]) -> Vec<Point> {
        let (first, last) = match (path.first(), path.last()) {
            (Some(&first), Some(&last)) if path.len() >= 3 => (first, last),
            _ => return path.to_vec(),
        };

        let interior = match max_deviation(path) {
            Some((index, dist)) if dist >= self.deviation_threshold => path[index],
            _ => path[path.len() / 2],
        };

        vec![first, interior, last]
    }
}

impl Default for PathReducer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce with the default threshold
pub fn reduce(path: &[Point]) -> Vec<Point> {
    PathReducer::new().reduce(path)
}

/// Index and distance of the interior point farthest from the chord.
///
/// Ties go to the earliest point. Returns `None` when the path has no
/// interior points.
pub fn max_deviation(path: &[Point]) -> Option<(usize, f64)> {
    if path.len() < 3 {
        return None;
    }
    let start = &path[0];
    let end = &path[path.len() - 1];

    let mut max_dist = 0.0;
    let mut max_index = 1;

    for (i, point) in path.iter().enumerate().skip(1).take(path.len() - 2) {
        let dist = point.perpendicular_distance(start, end);
        if dist > max_dist {
            max_dist = dist;
            max_index = i;
        }
    }

    Some((max_index, max_dist))
}
