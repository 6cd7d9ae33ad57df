// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography: exact projective mapping between two quadrilaterals,
// solved as an 8x8 linear system with the bottom-right entry fixed at 1.

use flatscan_core::Point2D;
use flatscan_core::error::{FlatscanError, Result};
use imageproc::geometric_transformations::Projection;
use tracing::debug;

/// Smallest pivot accepted during elimination, in normalised coordinates.
const PIVOT_EPSILON: f64 = 1e-10;

/// Smallest `|det| / Hadamard bound` accepted when inverting.
const SINGULAR_EPSILON: f64 = 1e-14;

/// Relative tolerance for treating three points as collinear.
const COLLINEAR_EPSILON: f64 = 1e-9;

/// A 3x3 projective transform in row-major order.
///
/// Points are mapped as `[x', y', w]ᵀ = M · [x, y, 1]ᵀ` followed by division
/// by `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomographyMatrix {
    m: [[f64; 3]; 3],
}

impl HomographyMatrix {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub const fn from_rows(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    /// Map a point. Returns `None` when it lands on the line at infinity.
    pub fn apply(&self, p: Point2D) -> Option<Point2D> {
        let m = &self.m;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w.abs() < f64::EPSILON {
            return None;
        }
        let x = (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w;
        let y = (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w;
        Some(Point2D::new(x, y))
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse via the adjugate, rescaled so the bottom-right entry is 1 where
    /// possible.
    ///
    /// The determinant is compared against the product of the row norms
    /// (its Hadamard bound), so the test does not depend on the scale of
    /// individual rows or on how far the mapping translates.
    pub fn inverse(&self) -> Result<Self> {
        let m = &self.m;
        let det = self.determinant();
        let bound: f64 = m
            .iter()
            .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
            .product();
        if !det.is_finite() || !bound.is_finite() || det.abs() <= SINGULAR_EPSILON * bound {
            return Err(FlatscanError::SingularTransform(format!(
                "matrix is not invertible (determinant {det:e})"
            )));
        }

        let inv_det = 1.0 / det;
        let mut inv = [[0.0f64; 3]; 3];
        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        let inverse = Self { m: inv };
        Ok(inverse.normalized().unwrap_or(inverse))
    }

    /// Matrix product `self · rhs` (apply `rhs` first).
    pub fn compose(&self, rhs: &Self) -> Self {
        let mut out = [[0.0f64; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[r][k] * rhs.m[k][c]).sum();
            }
        }
        Self { m: out }
    }

    /// Scale so the bottom-right entry is 1. `None` if it is (near) zero.
    pub fn normalized(&self) -> Option<Self> {
        let h22 = self.m[2][2];
        if h22.abs() < PIVOT_EPSILON || !h22.is_finite() {
            return None;
        }
        let mut out = self.m;
        out.iter_mut().flatten().for_each(|v| *v /= h22);
        Some(Self { m: out })
    }

    /// Convert to an `imageproc` projection (single precision), for callers
    /// that want to warp with `imageproc::geometric_transformations`.
    pub fn to_projection(&self) -> Option<Projection> {
        let m = &self.m;
        Projection::from_matrix([
            m[0][0] as f32,
            m[0][1] as f32,
            m[0][2] as f32,
            m[1][0] as f32,
            m[1][1] as f32,
            m[1][2] as f32,
            m[2][0] as f32,
            m[2][1] as f32,
            m[2][2] as f32,
        ])
    }
}

impl Default for HomographyMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Solve for the homography mapping each `src[i]` exactly onto `dst[i]`.
///
/// Both point sets are first normalised (centroid at the origin, mean distance
/// √2) so the elimination is well conditioned for pixel-sized coordinates.
///
/// Fails with [`FlatscanError::SingularTransform`] if any three points of
/// either set are collinear or the linear system has no unique solution.
pub fn solve_homography(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Result<HomographyMatrix> {
    check_general_position(src, "source")?;
    check_general_position(dst, "destination")?;

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    // Augmented 8x9 system. For each correspondence (x, y) -> (u, v):
    //   x h0 + y h1 + h2 - u x h6 - u y h7 = u
    //   x h3 + y h4 + h5 - v x h6 - v y h7 = v
    let mut a = [[0.0f64; 9]; 8];
    for (i, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        a[2 * i] = [s.x, s.y, 1.0, 0.0, 0.0, 0.0, -d.x * s.x, -d.x * s.y, d.x];
        a[2 * i + 1] = [0.0, 0.0, 0.0, s.x, s.y, 1.0, -d.y * s.x, -d.y * s.y, d.y];
    }

    let h = solve_linear_8(a)?;
    let normalized = HomographyMatrix::from_rows([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], 1.0],
    ]);

    // H = T_dst⁻¹ · H_norm · T_src
    let t_dst_inv = t_dst.inverse()?;
    let homography = t_dst_inv
        .compose(&normalized)
        .compose(&t_src)
        .normalized()
        .ok_or_else(|| {
            FlatscanError::SingularTransform("homography has a vanishing scale entry".into())
        })?;

    debug!(matrix = ?homography.rows(), "Homography solved");
    Ok(homography)
}

/// Gaussian elimination with partial pivoting on an 8x9 augmented matrix.
fn solve_linear_8(mut a: [[f64; 9]; 8]) -> Result<[f64; 8]> {
    for col in 0..8 {
        let pivot_row = (col..8)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        let pivot = a[pivot_row][col];
        if !pivot.is_finite() || pivot.abs() < PIVOT_EPSILON {
            return Err(FlatscanError::SingularTransform(format!(
                "linear system is singular (pivot {pivot:e} in column {col})"
            )));
        }
        a.swap(col, pivot_row);

        for row in (col + 1)..8 {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in col..9 {
                a[row][c] -= factor * a[col][c];
            }
        }
    }

    let mut h = [0.0f64; 8];
    for row in (0..8).rev() {
        let tail: f64 = ((row + 1)..8).map(|c| a[row][c] * h[c]).sum();
        h[row] = (a[row][8] - tail) / a[row][row];
    }
    Ok(h)
}

/// Translate the centroid to the origin and scale the mean distance to √2.
fn normalize_points(points: &[Point2D; 4]) -> (HomographyMatrix, [Point2D; 4]) {
    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = points
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > f64::EPSILON {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let transform =
        HomographyMatrix::from_rows([[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]]);
    let normalized = points.map(|p| Point2D::new(s * (p.x - cx), s * (p.y - cy)));
    (transform, normalized)
}

/// Reject point sets with non-finite coordinates or any collinear triple.
fn check_general_position(points: &[Point2D; 4], label: &str) -> Result<()> {
    if points.iter().any(|p| !p.is_finite()) {
        return Err(FlatscanError::SingularTransform(format!(
            "{label} points contain non-finite coordinates"
        )));
    }

    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for [i, j, k] in TRIPLES {
        let (a, b, c) = (points[i], points[j], points[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        let scale = a.distance(&b) * a.distance(&c);
        if cross.abs() <= COLLINEAR_EPSILON * scale {
            return Err(FlatscanError::SingularTransform(format!(
                "{label} points {} {} {} are collinear",
                points[i], points[j], points[k]
            )));
        }
    }
    Ok(())
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: [(f64, f64); 4]) -> [Point2D; 4] {
        raw.map(Point2D::from)
    }

    fn assert_close(a: Point2D, b: Point2D, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected {b}, got {a}"
        );
    }

    fn assert_matrix_close(a: &HomographyMatrix, b: &HomographyMatrix, tol: f64) {
        for (ra, rb) in a.rows().iter().zip(b.rows()) {
            for (va, vb) in ra.iter().zip(rb) {
                assert!((va - vb).abs() < tol, "expected {:?}, got {:?}", b, a);
            }
        }
    }

    #[test]
    fn identical_quads_give_identity() {
        let square = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let h = solve_homography(&square, &square).unwrap();
        assert_matrix_close(&h, &HomographyMatrix::identity(), 1e-9);
    }

    #[test]
    fn square_onto_pixel_grid_is_uniform_scale() {
        let square = pts([(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        let grid = pts([(0.0, 0.0), (99.0, 0.0), (99.0, 99.0), (0.0, 99.0)]);
        let h = solve_homography(&square, &grid).unwrap();
        let expected =
            HomographyMatrix::from_rows([[0.99, 0.0, 0.0], [0.0, 0.99, 0.0], [0.0, 0.0, 1.0]]);
        assert_matrix_close(&h, &expected, 1e-9);
    }

    #[test]
    fn maps_every_corner_exactly() {
        let src = pts([(50.0, 0.0), (150.0, 0.0), (180.0, 100.0), (20.0, 100.0)]);
        let dst = pts([(0.0, 0.0), (159.0, 0.0), (159.0, 99.0), (0.0, 99.0)]);
        let h = solve_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(*s).unwrap(), *d, 1e-6);
        }
    }

    #[test]
    fn recovers_known_projective_matrix() {
        let known = HomographyMatrix::from_rows([
            [1.2, 0.1, 30.0],
            [-0.05, 0.9, 12.0],
            [0.0004, -0.0002, 1.0],
        ]);
        let src = pts([(10.0, 20.0), (400.0, 35.0), (380.0, 520.0), (25.0, 490.0)]);
        let dst = src.map(|p| known.apply(p).unwrap());
        let h = solve_homography(&src, &dst).unwrap();
        assert_matrix_close(&h, &known, 1e-6);
    }

    #[test]
    fn inverse_round_trips_points() {
        let src = pts([(12.0, 7.0), (640.0, 40.0), (600.0, 470.0), (30.0, 455.0)]);
        let dst = pts([(0.0, 0.0), (599.0, 0.0), (599.0, 449.0), (0.0, 449.0)]);
        let h = solve_homography(&src, &dst).unwrap();
        let inv = h.inverse().unwrap();

        let point = Point2D::new(321.5, 210.25);
        let back = inv.apply(h.apply(point).unwrap()).unwrap();
        assert_close(back, point, 1e-6);
        assert_matrix_close(
            &h.compose(&inv).normalized().unwrap(),
            &HomographyMatrix::identity(),
            1e-9,
        );
    }

    #[test]
    fn far_translated_rectangle_is_invertible() {
        for offset in [1e4, 1e5, 3e5, 1e6] {
            let src = pts([
                (offset, offset),
                (offset + 100.0, offset),
                (offset + 100.0, offset + 80.0),
                (offset, offset + 80.0),
            ]);
            let dst = pts([(0.0, 0.0), (99.0, 0.0), (99.0, 79.0), (0.0, 79.0)]);
            let h = solve_homography(&src, &dst).unwrap();
            let inv = h.inverse().unwrap();
            assert_close(inv.apply(Point2D::new(0.0, 0.0)).unwrap(), src[0], 1e-4 * offset);
        }
    }

    #[test]
    fn rank_deficient_matrix_is_not_invertible() {
        let flat =
            HomographyMatrix::from_rows([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(flat.inverse(), Err(FlatscanError::SingularTransform(_))));
    }

    #[test]
    fn collinear_source_is_singular() {
        let line = pts([(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);
        let dst = pts([(0.0, 0.0), (9.0, 0.0), (9.0, 9.0), (0.0, 9.0)]);
        assert!(matches!(
            solve_homography(&line, &dst),
            Err(FlatscanError::SingularTransform(_))
        ));
    }

    #[test]
    fn three_collinear_points_are_singular() {
        let src = pts([(0.0, 0.0), (50.0, 50.0), (100.0, 100.0), (0.0, 100.0)]);
        let dst = pts([(0.0, 0.0), (99.0, 0.0), (99.0, 99.0), (0.0, 99.0)]);
        assert!(solve_homography(&src, &dst).is_err());
    }

    #[test]
    fn coincident_points_are_singular() {
        let src = pts([(5.0, 5.0); 4]);
        let dst = pts([(0.0, 0.0), (9.0, 0.0), (9.0, 9.0), (0.0, 9.0)]);
        assert!(matches!(
            solve_homography(&src, &dst),
            Err(FlatscanError::SingularTransform(_))
        ));
    }

    #[test]
    fn zero_matrix_is_not_invertible() {
        let zero = HomographyMatrix::from_rows([[0.0; 3]; 3]);
        assert!(matches!(zero.inverse(), Err(FlatscanError::SingularTransform(_))));
    }

    #[test]
    fn point_at_infinity_maps_to_none() {
        let h = HomographyMatrix::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(h.apply(Point2D::new(0.0, 5.0)).is_none());
    }

    #[test]
    fn converts_to_imageproc_projection() {
        let h = HomographyMatrix::from_rows([[2.0, 0.0, 1.0], [0.0, 2.0, 3.0], [0.0, 0.0, 1.0]]);
        let projection = h.to_projection().unwrap();
        let (x, y) = projection * (1.0f32, 1.0f32);
        assert!((x - 3.0).abs() < 1e-5 && (y - 5.0).abs() < 1e-5);
    }
}
