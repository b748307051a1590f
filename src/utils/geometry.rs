use std::ops::Sub;

use serde::{Deserialize, Serialize};

/// A 2-D point in normalized image coordinates (`[0, 1]` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn midpoint(self, other: Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Mean of the given points, or `None` when there are none.
pub fn centroid<I>(points: I) -> Option<Point2>
where
    I: IntoIterator<Item = Point2>,
{
    let (sum_x, sum_y, count) = points
        .into_iter()
        .fold((0.0f32, 0.0f32, 0u32), |(sx, sy, n), p| (sx + p.x, sy + p.y, n + 1));

    if count == 0 {
        return None;
    }

    Some(Point2::new(sum_x / count as f32, sum_y / count as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_nothing_is_none() {
        assert_eq!(centroid(std::iter::empty()), None);
    }

    #[test]
    fn centroid_averages_points() {
        let c = centroid([Point2::new(0.0, 0.0), Point2::new(1.0, 0.5)]).unwrap();
        assert!((c.x - 0.5).abs() < 1e-6);
        assert!((c.y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn magnitude_is_euclidean() {
        assert!((Point2::new(0.3, 0.4).magnitude() - 0.5).abs() < 1e-6);
        assert_eq!((Point2::new(0.7, 0.2) - Point2::new(0.5, 0.2)).y, 0.0);
    }
}
