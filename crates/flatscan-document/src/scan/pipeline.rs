// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document scanning pipeline — working-copy scaling, candidate ranking, and
// rectification with fallback to the next-best candidate contour.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{
    ClassifierKind, Contour, DestinationRectangle, OrderedQuadrilateral, Point2D, Quadrilateral,
    ScanConfig,
};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::scan::rectify::PerspectiveRectifier;

/// A rectified document together with the geometry that produced it.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub image: DynamicImage,
    /// Corners in original-image coordinates.
    pub corners: OrderedQuadrilateral,
    pub destination: DestinationRectangle,
    /// Position of the winning contour in the area ranking (0 = largest).
    pub rank: usize,
}

/// A contour with its position in the area ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub rank: usize,
    pub area: f64,
    pub contour: Contour,
}

/// Rectifies the first usable candidate contour of a photographed page.
///
/// Contour detection itself happens elsewhere, usually on a downsized working
/// copy (see [`working_copy`]). The scanner ranks the supplied contours by
/// area, keeps the largest few, and tries each four-vertex candidate in turn.
pub struct DocumentScanner {
    config: ScanConfig,
    rectifier: PerspectiveRectifier<ClassifierKind>,
}

impl DocumentScanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let rectifier = PerspectiveRectifier::from_config(&config);
        Ok(Self { config, rectifier })
    }

    /// Share a flag that aborts rectification once set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.rectifier = self.rectifier.with_cancel_flag(flag);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Downsize `image` to the configured working height for contour
    /// detection. See [`working_copy`].
    pub fn prepare(&self, image: &DynamicImage) -> Result<(DynamicImage, f64)> {
        working_copy(image, self.config.working_height)
    }

    /// Rectify the document out of `image`.
    ///
    /// `contours` are in working-copy coordinates; `ratio` scales them back to
    /// `image` (1.0 if they already match). Candidates that turn out to be bad
    /// geometry are skipped; other failures abort the scan.
    #[instrument(skip_all, fields(contours = contours.len(), ratio = ratio))]
    pub fn scan(
        &self,
        image: &DynamicImage,
        contours: &[Contour],
        ratio: f64,
    ) -> Result<ScanOutcome> {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(FlatscanError::InvalidInput(format!(
                "scale ratio must be positive and finite, got {ratio}"
            )));
        }

        let ranked = rank_candidates(contours, self.config.max_candidates);
        info!(candidates = ranked.len(), "Searching for document outline");

        for candidate in &ranked {
            if candidate.contour.len() != 4 {
                debug!(
                    rank = candidate.rank,
                    vertices = candidate.contour.len(),
                    "Skipping non-quadrilateral contour"
                );
                continue;
            }

            let quad = Quadrilateral::new(candidate.contour.clone()).scaled(ratio);
            let attempt = self.rectifier.plan(&quad).and_then(|plan| {
                let rectified = self.rectifier.apply(image, &plan)?;
                Ok((rectified, plan))
            });

            match attempt {
                Ok((rectified, plan)) => {
                    info!(
                        rank = candidate.rank,
                        width = plan.destination.width,
                        height = plan.destination.height,
                        "Document rectified"
                    );
                    let image = if self.config.output_grayscale {
                        ImageProcessor::from_dynamic(rectified).grayscale().into_dynamic()
                    } else {
                        rectified
                    };
                    return Ok(ScanOutcome {
                        image,
                        corners: plan.corners,
                        destination: plan.destination,
                        rank: candidate.rank,
                    });
                }
                Err(err) if err.is_geometric() => {
                    warn!(rank = candidate.rank, error = %err, "Candidate rejected; trying next");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(candidates = ranked.len(), "No usable document outline");
        Err(FlatscanError::NoDocumentFound {
            candidates: ranked.len(),
        })
    }
}

/// Ratio that maps working-copy coordinates back to the original image.
pub fn working_ratio(original_height: u32, working_height: u32) -> f64 {
    f64::from(original_height) / f64::from(working_height)
}

/// Resize `image` to `working_height` rows, preserving aspect ratio, and
/// return it with the ratio `original_height / working_height`.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn working_copy(image: &DynamicImage, working_height: u32) -> Result<(DynamicImage, f64)> {
    if working_height == 0 {
        return Err(FlatscanError::Config(
            "working_height must be at least 1".into(),
        ));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(FlatscanError::ImageError(format!(
            "cannot resize an empty {}x{} image",
            image.width(),
            image.height()
        )));
    }

    let ratio = working_ratio(image.height(), working_height);
    let resized = ImageProcessor::from_dynamic(image.clone())
        .resize_to_height(working_height)
        .into_dynamic();
    debug!(ratio, new_w = resized.width(), new_h = resized.height(), "Working copy ready");
    Ok((resized, ratio))
}

/// Sort contours by enclosed area, largest first, and keep the top
/// `max_candidates`. Equal areas keep their input order.
pub fn rank_candidates(contours: &[Contour], max_candidates: usize) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = contours
        .iter()
        .map(|contour| RankedCandidate {
            rank: 0,
            area: polygon_area(contour),
            contour: contour.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| b.area.total_cmp(&a.area));
    ranked.truncate(max_candidates);
    for (rank, candidate) in ranked.iter_mut().enumerate() {
        candidate.rank = rank;
    }
    ranked
}

/// Area of a closed polygon by the shoelace formula. The vertices may run
/// clockwise or counter-clockwise.
pub fn polygon_area(vertices: &[Point2D]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area.abs() / 2.0
}

// -- Tests --------------------------------------------------------------------
