// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner classification: assigns top-left / top-right / bottom-right /
// bottom-left roles to the four unordered points of a document boundary.

use std::cmp::Ordering;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{ClassifierKind, OrderedQuadrilateral, Point2D, Quadrilateral};
use tracing::debug;

/// Assigns canonical corner roles to an unordered quadrilateral.
///
/// Implementations must return a permutation of the input points and fail with
/// [`FlatscanError::InvalidInput`] when the input does not hold exactly four
/// finite points.
pub trait CornerClassifier {
    fn classify(&self, quad: &Quadrilateral) -> Result<OrderedQuadrilateral>;
}

/// Order a quadrilateral with the default sum/difference heuristic.
pub fn order(quad: &Quadrilateral) -> Result<OrderedQuadrilateral> {
    SumDiffClassifier.classify(quad)
}

/// The classic scanner heuristic.
///
/// The point with the smallest `x + y` is top-left and the largest is
/// bottom-right. Of the remaining two, the smaller `y - x` is top-right and the
/// larger is bottom-left. Exact ties may resolve either way.
///
/// Only reliable for documents that are roughly upright in the frame. When the
/// resulting boundary `tl → tr → br → bl` crosses itself (typical for
/// rotations near 45°) the input is rejected instead of returning a bowtie.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumDiffClassifier;

impl CornerClassifier for SumDiffClassifier {
    fn classify(&self, quad: &Quadrilateral) -> Result<OrderedQuadrilateral> {
        let points = four_points(quad)?;
        let all = [0usize, 1, 2, 3];

        let top_left = extreme(&points, &all, Point2D::sum, Ordering::Less);
        // Excluding top-left keeps the roles distinct when every sum ties.
        let others: Vec<usize> = all.into_iter().filter(|&i| i != top_left).collect();
        let bottom_right = extreme(&points, &others, Point2D::sum, Ordering::Greater);

        let rest: Vec<usize> = all
            .into_iter()
            .filter(|&i| i != top_left && i != bottom_right)
            .collect();
        let top_right = extreme(&points, &rest, Point2D::diff, Ordering::Less);
        let bottom_left = if rest[0] == top_right { rest[1] } else { rest[0] };

        let ordered = OrderedQuadrilateral {
            top_left: points[top_left],
            top_right: points[top_right],
            bottom_right: points[bottom_right],
            bottom_left: points[bottom_left],
        };

        if is_self_intersecting(&ordered) {
            return Err(FlatscanError::InvalidInput(format!(
                "corner roles cross each other (tl={}, tr={}, br={}, bl={}); \
                 the quadrilateral is rotated too far for the sum/difference heuristic",
                ordered.top_left, ordered.top_right, ordered.bottom_right, ordered.bottom_left
            )));
        }

        debug!(
            top_left = %ordered.top_left,
            top_right = %ordered.top_right,
            bottom_right = %ordered.bottom_right,
            bottom_left = %ordered.bottom_left,
            "Corners ordered by sum/difference"
        );
        Ok(ordered)
    }
}

/// Orders points clockwise by their angle around the centroid, starting from
/// the point with the smallest `x + y`.
///
/// Unlike [`SumDiffClassifier`] this keeps working for documents rotated by
/// 45° or more, at the cost of a few trigonometric calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidAngleClassifier;

impl CornerClassifier for CentroidAngleClassifier {
    fn classify(&self, quad: &Quadrilateral) -> Result<OrderedQuadrilateral> {
        let points = four_points(quad)?;
        let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

        // With y pointing down, increasing atan2 runs clockwise on screen.
        let mut sorted = points;
        sorted.sort_by(|a, b| {
            let angle_a = (a.y - cy).atan2(a.x - cx);
            let angle_b = (b.y - cy).atan2(b.x - cx);
            angle_a.total_cmp(&angle_b)
        });

        let start = extreme(&sorted, &[0, 1, 2, 3], Point2D::sum, Ordering::Less);
        sorted.rotate_left(start);

        let ordered = OrderedQuadrilateral::from_corners(sorted);
        debug!(
            top_left = %ordered.top_left,
            top_right = %ordered.top_right,
            bottom_right = %ordered.bottom_right,
            bottom_left = %ordered.bottom_left,
            "Corners ordered by centroid angle"
        );
        Ok(ordered)
    }
}

impl CornerClassifier for ClassifierKind {
    fn classify(&self, quad: &Quadrilateral) -> Result<OrderedQuadrilateral> {
        match self {
            ClassifierKind::SumDiff => SumDiffClassifier.classify(quad),
            ClassifierKind::CentroidAngle => CentroidAngleClassifier.classify(quad),
        }
    }
}

impl<C: CornerClassifier + ?Sized> CornerClassifier for Box<C> {
    fn classify(&self, quad: &Quadrilateral) -> Result<OrderedQuadrilateral> {
        (**self).classify(quad)
    }
}

// -- Helpers ------------------------------------------------------------------

/// Validate the point count and coordinates, returning the points as an array.
fn four_points(quad: &Quadrilateral) -> Result<[Point2D; 4]> {
    let points: [Point2D; 4] = quad.points().try_into().map_err(|_| {
        FlatscanError::InvalidInput(format!(
            "expected exactly 4 corner points, got {}",
            quad.len()
        ))
    })?;
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(FlatscanError::InvalidInput(format!(
            "corner point {bad} is not finite"
        )));
    }
    Ok(points)
}

/// Index (from `candidates`) of the point whose `key` is smallest
/// (`Ordering::Less`) or largest (`Ordering::Greater`).
fn extreme(
    points: &[Point2D; 4],
    candidates: &[usize],
    key: fn(&Point2D) -> f64,
    want: Ordering,
) -> usize {
    candidates
        .iter()
        .copied()
        .reduce(|best, i| {
            if key(&points[i]).total_cmp(&key(&points[best])) == want {
                i
            } else {
                best
            }
        })
        .unwrap_or(0)
}

/// Whether the closed boundary `tl → tr → br → bl` has two opposite edges that
/// cross. Touching or collinear edges do not count.
fn is_self_intersecting(quad: &OrderedQuadrilateral) -> bool {
    let [tl, tr, br, bl] = quad.corners();
    segments_cross(tl, tr, br, bl) || segments_cross(tr, br, bl, tl)
}

fn segments_cross(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Twice the signed area of the triangle `a, b, c`.
fn orientation(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(points: [(f64, f64); 4]) -> Quadrilateral {
        Quadrilateral::from_points(points)
    }

    fn same_set(ordered: &OrderedQuadrilateral, input: &Quadrilateral) -> bool {
        let corners = ordered.corners();
        input.points().iter().all(|p| corners.contains(p))
            && corners.iter().all(|c| input.points().contains(c))
    }

    #[test]
    fn orders_shuffled_rectangle() {
        let input = quad([(200.0, 10.0), (15.0, 310.0), (5.0, 20.0), (210.0, 300.0)]);
        let ordered = order(&input).unwrap();

        assert_eq!(ordered.top_left, Point2D::new(5.0, 20.0));
        assert_eq!(ordered.top_right, Point2D::new(200.0, 10.0));
        assert_eq!(ordered.bottom_right, Point2D::new(210.0, 300.0));
        assert_eq!(ordered.bottom_left, Point2D::new(15.0, 310.0));
        assert!(same_set(&ordered, &input));
    }

    #[test]
    fn role_constraints_hold_for_tilted_document() {
        let input = quad([(320.0, 80.0), (60.0, 40.0), (300.0, 420.0), (90.0, 400.0)]);
        let ordered = order(&input).unwrap();
        let corners = ordered.corners();

        for p in input.points() {
            assert!(ordered.top_left.sum() <= p.sum());
            assert!(ordered.bottom_right.sum() >= p.sum());
        }
        assert!(ordered.top_right.diff() <= ordered.bottom_left.diff());
        assert!(same_set(&ordered, &input));
        assert_eq!(corners.len(), 4);
    }

    #[test]
    fn ordering_is_idempotent() {
        let input = quad([(150.0, 0.0), (20.0, 100.0), (50.0, 0.0), (180.0, 100.0)]);
        let once = order(&input).unwrap();
        let twice = order(&Quadrilateral::from(once)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_wrong_point_counts() {
        let three = Quadrilateral::from_points([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert!(matches!(order(&three), Err(FlatscanError::InvalidInput(_))));

        let five = Quadrilateral::from_points([
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.5, 0.5),
        ]);
        assert!(matches!(order(&five), Err(FlatscanError::InvalidInput(_))));
        assert!(matches!(
            CentroidAngleClassifier.classify(&five),
            Err(FlatscanError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_non_finite_points() {
        let input = quad([(0.0, 0.0), (f64::NAN, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(matches!(order(&input), Err(FlatscanError::InvalidInput(_))));
    }

    #[test]
    fn tied_sums_still_yield_a_permutation() {
        // A diamond: (50,0) and (0,50) tie on sum, as do (100,50) and (50,100).
        // Which point wins a tie is unspecified; only check the output is a
        // valid, non-crossing permutation.
        let input = quad([(50.0, 0.0), (100.0, 50.0), (50.0, 100.0), (0.0, 50.0)]);
        match order(&input) {
            Ok(ordered) => {
                assert!(same_set(&ordered, &input));
                assert!(!is_self_intersecting(&ordered));
            }
            Err(err) => assert!(matches!(err, FlatscanError::InvalidInput(_))),
        }
    }

    #[test]
    fn heavily_rotated_quad_is_rejected_by_sum_diff() {
        let input = quad([(190.0, 0.0), (140.0, 80.0), (70.0, 180.0), (30.0, 100.0)]);
        assert!(matches!(order(&input), Err(FlatscanError::InvalidInput(_))));
    }

    #[test]
    fn centroid_angle_handles_heavily_rotated_quad() {
        let input = quad([(190.0, 0.0), (140.0, 80.0), (70.0, 180.0), (30.0, 100.0)]);
        let ordered = CentroidAngleClassifier.classify(&input).unwrap();

        assert_eq!(ordered.top_left, Point2D::new(30.0, 100.0));
        assert_eq!(ordered.top_right, Point2D::new(190.0, 0.0));
        assert_eq!(ordered.bottom_right, Point2D::new(140.0, 80.0));
        assert_eq!(ordered.bottom_left, Point2D::new(70.0, 180.0));
        assert!(!is_self_intersecting(&ordered));
    }

    #[test]
    fn classifiers_agree_on_upright_documents() {
        let input = quad([(410.0, 395.0), (12.0, 8.0), (400.0, 15.0), (20.0, 380.0)]);
        let sum_diff = SumDiffClassifier.classify(&input).unwrap();
        let angle = CentroidAngleClassifier.classify(&input).unwrap();
        assert_eq!(sum_diff, angle);
    }

    #[test]
    fn classifier_kind_dispatches() {
        let input = quad([(190.0, 0.0), (140.0, 80.0), (70.0, 180.0), (30.0, 100.0)]);
        assert!(ClassifierKind::SumDiff.classify(&input).is_err());
        assert!(ClassifierKind::CentroidAngle.classify(&input).is_ok());

        let boxed: Box<dyn CornerClassifier> = Box::new(CentroidAngleClassifier);
        assert!(boxed.classify(&input).is_ok());
    }

    #[test]
    fn equal_sums_still_assign_distinct_roles() {
        // Every point lies on x + y = 30.
        let input = quad([(0.0, 30.0), (10.0, 20.0), (20.0, 10.0), (30.0, 0.0)]);
        let ordered = order(&input).unwrap();
        assert!(same_set(&ordered, &input));
        assert_ne!(ordered.top_left, ordered.bottom_right);

        let coincident = quad([(5.0, 5.0); 4]);
        let ordered = order(&coincident).unwrap();
        assert!(same_set(&ordered, &coincident));
    }

    #[test]
    fn collinear_points_are_passed_through() {
        // Degenerate geometry is reported later, by the size and transform
        // checks, not by the classifier.
        let input = quad([(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let ordered = order(&input).unwrap();
        assert!(same_set(&ordered, &input));
    }
}
