// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry — corner classification and four-point homographies.

pub mod corners;
pub mod homography;

pub use corners::{CentroidAngleClassifier, CornerClassifier, SumDiffClassifier, order};
pub use homography::{HomographyMatrix, solve_homography};
