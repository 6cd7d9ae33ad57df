// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan-document — Document rectification for Flatscan.
//
// Orders the four corners of a photographed document, solves the homography
// onto an upright rectangle sized from the document's edges, and resamples the
// photo through it (bilinear, row-parallel). A small pipeline on top picks the
// best candidate among ranked contours from an external edge detector.

pub mod geometry;
pub mod image;
pub mod scan;

// Re-export the primary entry points so callers can use `flatscan_document::rectify` etc.
pub use geometry::{
    CentroidAngleClassifier, CornerClassifier, HomographyMatrix, SumDiffClassifier, order,
    solve_homography,
};
pub use image::processor::ImageProcessor;
pub use scan::{
    DocumentScanner, PerspectiveRectifier, RectificationPlan, ScanOutcome, destination_size,
    rectify,
};
