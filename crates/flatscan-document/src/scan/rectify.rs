// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — warps the document quadrilateral of a photo onto
// an axis-aligned rectangle sized from the quadrilateral's own edges.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{
    ClassifierKind, DestinationRectangle, OrderedQuadrilateral, Point2D, Quadrilateral, ScanConfig,
};
use image::{DynamicImage, ImageBuffer, Pixel};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::geometry::corners::{CornerClassifier, SumDiffClassifier};
use crate::geometry::homography::{HomographyMatrix, solve_homography};

/// Largest output, in samples (pixels times channels), that will be allocated.
pub const MAX_OUTPUT_SAMPLES: usize = 1 << 30;

/// Rectify `quad` out of `image` with default settings: sum/difference corner
/// ordering and a black background.
pub fn rectify(image: &DynamicImage, quad: &Quadrilateral) -> Result<DynamicImage> {
    PerspectiveRectifier::new().rectify(image, quad)
}

/// Output size for an ordered quadrilateral.
///
/// Width is the longer of the top and bottom edges and height the longer of
/// the left and right edges, each floored to whole pixels. The longer edge is
/// the one closer to the camera, so it carries the least foreshortening.
///
/// Fails with [`FlatscanError::DegenerateGeometry`] if either estimate is not
/// positive. Positive estimates below one pixel are raised to 1.
pub fn destination_size(corners: &OrderedQuadrilateral) -> Result<DestinationRectangle> {
    let OrderedQuadrilateral {
        top_left: tl,
        top_right: tr,
        bottom_right: br,
        bottom_left: bl,
    } = *corners;

    let width = br.distance(&bl).max(tr.distance(&tl));
    let height = tr.distance(&br).max(tl.distance(&bl));

    if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
        return Err(FlatscanError::DegenerateGeometry { width, height });
    }
    if width > f64::from(u32::MAX) || height > f64::from(u32::MAX) {
        return Err(FlatscanError::ImageError(format!(
            "output of {width:.0}x{height:.0} pixels is too large"
        )));
    }

    Ok(DestinationRectangle {
        width: (width.floor() as u32).max(1),
        height: (height.floor() as u32).max(1),
    })
}

/// Everything needed to resample: the ordered corners, the output size and
/// the forward mapping from source to output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectificationPlan {
    pub corners: OrderedQuadrilateral,
    pub destination: DestinationRectangle,
    pub homography: HomographyMatrix,
}

/// Warps a document quadrilateral onto an upright rectangle.
///
/// The corner classification strategy is a type parameter so that callers can
/// swap in a more robust classifier without touching the warp itself.
///
/// ```ignore
/// let flat = PerspectiveRectifier::new()
///     .with_background(1.0)
///     .rectify(&photo, &quad)?;
/// ```
#[derive(Debug, Clone)]
pub struct PerspectiveRectifier<C = SumDiffClassifier> {
    classifier: C,
    /// Normalised intensity for pixels that map outside the source.
    background: f32,
    /// Outputs with at least this many pixels are resampled on the rayon pool.
    parallel_min_pixels: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl PerspectiveRectifier<SumDiffClassifier> {
    pub fn new() -> Self {
        Self::with_classifier(SumDiffClassifier)
    }
}

impl Default for PerspectiveRectifier<SumDiffClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl PerspectiveRectifier<ClassifierKind> {
    /// Build a rectifier from scan settings.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::with_classifier(config.classifier)
            .with_background(config.background)
            .with_parallel_min_pixels(config.parallel_min_pixels)
    }
}

impl<C: CornerClassifier> PerspectiveRectifier<C> {
    pub fn with_classifier(classifier: C) -> Self {
        let defaults = ScanConfig::default();
        Self {
            classifier,
            background: defaults.background,
            parallel_min_pixels: defaults.parallel_min_pixels,
            cancel: None,
        }
    }

    /// Background intensity in `0.0..=1.0` (0 = black). Out-of-range values
    /// are clamped.
    pub fn with_background(mut self, background: f32) -> Self {
        self.background = if background.is_nan() {
            0.0
        } else {
            background.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_parallel_min_pixels(mut self, pixels: usize) -> Self {
        self.parallel_min_pixels = pixels;
        self
    }

    /// Share a flag that aborts resampling between rows once set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Order the corners, size the output and solve the homography.
    #[instrument(skip_all, fields(points = quad.len()))]
    pub fn plan(&self, quad: &Quadrilateral) -> Result<RectificationPlan> {
        let corners = self.classifier.classify(quad)?;
        let destination = destination_size(&corners)?;
        debug!(
            width = destination.width,
            height = destination.height,
            "Destination size computed"
        );
        let homography = solve_homography(&corners.corners(), &destination.corners())?;
        Ok(RectificationPlan {
            corners,
            destination,
            homography,
        })
    }

    /// Rectify `quad` out of `image`. The returned image has the same pixel
    /// layout as the input.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn rectify(&self, image: &DynamicImage, quad: &Quadrilateral) -> Result<DynamicImage> {
        let plan = self.plan(quad)?;
        self.apply(image, &plan)
    }

    /// Resample `image` according to a previously computed plan.
    pub fn apply(&self, image: &DynamicImage, plan: &RectificationPlan) -> Result<DynamicImage> {
        let inverse = plan.homography.inverse()?;

        let output = match image {
            DynamicImage::ImageLuma8(buf) => {
                DynamicImage::ImageLuma8(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageLumaA8(buf) => {
                DynamicImage::ImageLumaA8(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgb8(buf) => {
                DynamicImage::ImageRgb8(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgba8(buf) => {
                DynamicImage::ImageRgba8(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageLuma16(buf) => {
                DynamicImage::ImageLuma16(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageLumaA16(buf) => {
                DynamicImage::ImageLumaA16(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgb16(buf) => {
                DynamicImage::ImageRgb16(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgba16(buf) => {
                DynamicImage::ImageRgba16(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgb32F(buf) => {
                DynamicImage::ImageRgb32F(self.warp(buf, plan, &inverse)?)
            }
            DynamicImage::ImageRgba32F(buf) => {
                DynamicImage::ImageRgba32F(self.warp(buf, plan, &inverse)?)
            }
            other => {
                return Err(FlatscanError::UnsupportedImage(format!(
                    "{:?}",
                    other.color()
                )));
            }
        };

        info!(
            out_w = plan.destination.width,
            out_h = plan.destination.height,
            "Perspective correction applied"
        );
        Ok(output)
    }

    /// Inverse-map every output pixel into `src` and sample it bilinearly.
    fn warp<P>(
        &self,
        src: &ImageBuffer<P, Vec<P::Subpixel>>,
        plan: &RectificationPlan,
        inverse: &HomographyMatrix,
    ) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
    where
        P: Pixel + Send + Sync,
        P::Subpixel: Sample,
    {
        let channels = usize::from(P::CHANNEL_COUNT);
        let DestinationRectangle { width, height } = plan.destination;
        let row_len = width as usize * channels;
        let samples = row_len
            .checked_mul(height as usize)
            .filter(|&n| n <= MAX_OUTPUT_SAMPLES)
            .ok_or_else(|| {
                FlatscanError::ImageError(format!(
                    "output of {width}x{height} pixels with {channels} channels is too large"
                ))
            })?;
        let background = P::Subpixel::from_unit(f64::from(self.background));
        let mut data = vec![background; samples];

        let (src_w, src_h) = src.dimensions();
        let raw = src.as_raw().as_slice();
        let cancel = self.cancel.as_deref();

        let fill_row = |(y, row): (usize, &mut [P::Subpixel])| {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return;
            }
            for (x, out) in row.chunks_exact_mut(channels).enumerate() {
                if let Some(at) = inverse.apply(Point2D::new(x as f64, y as f64)) {
                    sample_bilinear(raw, src_w, src_h, channels, at, out);
                }
            }
        };

        if plan.destination.pixel_count() >= self.parallel_min_pixels {
            data.par_chunks_mut(row_len).enumerate().for_each(&fill_row);
        } else {
            data.chunks_mut(row_len).enumerate().for_each(&fill_row);
        }

        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!("Rectification cancelled");
            return Err(FlatscanError::Cancelled);
        }

        ImageBuffer::from_raw(width, height, data).ok_or_else(|| {
            FlatscanError::ImageError(format!(
                "output buffer does not fit {width}x{height} with {channels} channels"
            ))
        })
    }
}

// -- Sampling helpers ---------------------------------------------------------

/// Sample types the warp can read and write.
trait Sample: Copy + Send + Sync {
    /// Value corresponding to full intensity.
    const FULL: f64;

    fn to_f64(self) -> f64;

    /// Convert back, rounding and clamping integer types to their range.
    fn from_f64(value: f64) -> Self;

    fn from_unit(value: f64) -> Self {
        Self::from_f64(value * Self::FULL)
    }
}

impl Sample for u8 {
    const FULL: f64 = u8::MAX as f64;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, Self::FULL) as u8
    }
}

impl Sample for u16 {
    const FULL: f64 = u16::MAX as f64;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, Self::FULL) as u16
    }
}

impl Sample for f32 {
    const FULL: f64 = 1.0;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

/// Write the bilinear sample of `raw` at `at` into `out`, one value per
/// channel. Leaves `out` untouched when `at` lies outside
/// `[0, width) x [0, height)`. On the last row or column the missing
/// neighbour is the edge sample itself.
fn sample_bilinear<S: Sample>(
    raw: &[S],
    width: u32,
    height: u32,
    channels: usize,
    at: Point2D,
    out: &mut [S],
) {
    let inside = at.x >= 0.0 && at.y >= 0.0 && at.x < f64::from(width) && at.y < f64::from(height);
    if !inside {
        return;
    }

    let x0 = at.x.floor() as usize;
    let y0 = at.y.floor() as usize;
    let x1 = (x0 + 1).min(width as usize - 1);
    let y1 = (y0 + 1).min(height as usize - 1);
    let fx = at.x - x0 as f64;
    let fy = at.y - y0 as f64;

    let stride = width as usize * channels;
    let at_index = |x: usize, y: usize, c: usize| raw[y * stride + x * channels + c].to_f64();

    for (c, value) in out.iter_mut().enumerate() {
        let top = at_index(x0, y0, c) * (1.0 - fx) + at_index(x1, y0, c) * fx;
        let bottom = at_index(x0, y1, c) * (1.0 - fx) + at_index(x1, y1, c) * fx;
        *value = S::from_f64(top * (1.0 - fy) + bottom * fy);
    }
}

// -- Tests --------------------------------------------------------------------
