// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core geometric types for document rectification.

use serde::{Deserialize, Serialize};

/// A point in image space. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `x + y`: smallest at the top-left of an upright document.
    pub fn sum(&self) -> f64 {
        self.x + self.y
    }

    /// `y - x`: smallest at the top-right of an upright document.
    pub fn diff(&self) -> f64 {
        self.y - self.x
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Multiply both coordinates by `ratio`.
    pub fn scaled(&self, ratio: f64) -> Self {
        Self::new(self.x * ratio, self.y * ratio)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl std::fmt::Display for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A closed polygon produced by an external contour-detection step.
pub type Contour = Vec<Point2D>;

/// An unordered set of points approximating a document boundary.
///
/// The type does not enforce the point count: a quadrilateral is expected to
/// hold exactly four points, and consumers report anything else as
/// [`FlatscanError::InvalidInput`](crate::FlatscanError::InvalidInput) rather
/// than padding or truncating.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quadrilateral {
    points: Vec<Point2D>,
}

impl Quadrilateral {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Build from anything yielding point-like values.
    pub fn from_points<I, P>(points: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Point2D>,
    {
        Self {
            points: points.into_iter().map(Into::into).collect(),
        }
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Rescale every point, e.g. from a downsized working copy back to the
    /// original resolution.
    pub fn scaled(&self, ratio: f64) -> Self {
        Self {
            points: self.points.iter().map(|p| p.scaled(ratio)).collect(),
        }
    }
}

impl From<[Point2D; 4]> for Quadrilateral {
    fn from(points: [Point2D; 4]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

/// Four corners in canonical role order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderedQuadrilateral {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl OrderedQuadrilateral {
    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    pub fn from_corners([top_left, top_right, bottom_right, bottom_left]: [Point2D; 4]) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }
}

impl From<OrderedQuadrilateral> for Quadrilateral {
    fn from(ordered: OrderedQuadrilateral) -> Self {
        Self::from(ordered.corners())
    }
}

/// Size of the rectified output in pixels. Both dimensions are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRectangle {
    pub width: u32,
    pub height: u32,
}

impl DestinationRectangle {
    /// Pixel-centre corners in role order:
    /// `(0,0), (w-1,0), (w-1,h-1), (0,h-1)`.
    pub fn corners(&self) -> [Point2D; 4] {
        let right = f64::from(self.width) - 1.0;
        let bottom = f64::from(self.height) - 1.0;
        [
            Point2D::new(0.0, 0.0),
            Point2D::new(right, 0.0),
            Point2D::new(right, bottom),
            Point2D::new(0.0, bottom),
        ]
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_sum_and_diff() {
        let p = Point2D::new(3.0, 10.0);
        assert_eq!(p.sum(), 13.0);
        assert_eq!(p.diff(), 7.0);
    }

    #[test]
    fn point_distance_is_euclidean() {
        let a = Point2D::new(1.0, 1.0);
        let b = Point2D::new(4.0, 5.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn quadrilateral_scaling_multiplies_all_points() {
        let quad =
            Quadrilateral::from_points([(10.0, 20.0), (30.0, 20.0), (30.0, 40.0), (10.0, 40.0)]);
        let scaled = quad.scaled(2.5);
        assert_eq!(scaled.len(), 4);
        assert_eq!(scaled.points()[0], Point2D::new(25.0, 50.0));
        assert_eq!(scaled.points()[2], Point2D::new(75.0, 100.0));
    }

    #[test]
    fn quadrilateral_keeps_wrong_point_counts() {
        let quad = Quadrilateral::from_points([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(quad.len(), 3);
    }

    #[test]
    fn destination_corners_use_last_pixel_index() {
        let rect = DestinationRectangle {
            width: 100,
            height: 50,
        };
        assert_eq!(
            rect.corners(),
            [
                Point2D::new(0.0, 0.0),
                Point2D::new(99.0, 0.0),
                Point2D::new(99.0, 49.0),
                Point2D::new(0.0, 49.0),
            ]
        );
        assert_eq!(rect.pixel_count(), 5000);
    }

    #[test]
    fn quadrilateral_deserializes_from_point_list() {
        let quad: Quadrilateral =
            serde_json::from_str(r#"[{"x":1,"y":2},{"x":3,"y":4}]"#).unwrap();
        assert_eq!(quad.points(), &[Point2D::new(1.0, 2.0), Point2D::new(3.0, 4.0)]);
    }
}
