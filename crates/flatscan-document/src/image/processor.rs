// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: loading, working-copy resizing, grayscale conversion and
// saving around the rectification core. Operates on in-memory images using
// the `image` crate.

use image::DynamicImage;
use flatscan_core::error::FlatscanError;
use tracing::{debug, info, instrument};

/// Thin wrapper for the image handling that surrounds rectification.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining.
///
/// ```ignore
/// let working = ImageProcessor::open("photo.jpg")?
///     .resize_to_height(500)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, FlatscanError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            FlatscanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image loaded"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Resize to exactly `height` rows, scaling the width to keep the aspect
    /// ratio. Uses Lanczos3 filtering.
    #[instrument(skip(self), fields(height))]
    pub fn resize_to_height(self, height: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if h == 0 || height == h {
            return self;
        }
        let width = ((f64::from(w) * f64::from(height) / f64::from(h)).round() as u32).max(1);
        debug!(from_w = w, from_h = h, width, height, "Resizing image");
        let resized = self
            .image
            .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Convert the image to grayscale (luma), keeping alpha and bit depth.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: self.image.grayscale(),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Write the image to a file. The format is inferred from the file extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), FlatscanError> {
        self.image.save(path.as_ref()).map_err(|err| {
            FlatscanError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = self.image.width(),
            height = self.image.height(),
            "Image saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn resize_to_height_keeps_aspect_ratio() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(640, 480, Luma([77u8])));
        let resized = ImageProcessor::from_dynamic(img).resize_to_height(240);
        assert_eq!((resized.width(), resized.height()), (320, 240));
    }

    #[test]
    fn resize_to_same_height_is_a_no_op() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 20, Luma([1u8])));
        let resized = ImageProcessor::from_dynamic(img.clone()).resize_to_height(20);
        assert_eq!(resized.as_dynamic(), &img);
    }

    #[test]
    fn grayscale_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 200, 30, 128])));
        let gray = ImageProcessor::from_dynamic(img).grayscale().into_dynamic();
        assert!(matches!(gray, DynamicImage::ImageLumaA8(_)));
    }

    #[test]
    fn save_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let img =
            DynamicImage::ImageLuma8(GrayImage::from_fn(12, 9, |x, y| Luma([(x * 20 + y) as u8])));

        ImageProcessor::from_dynamic(img.clone()).save(&path).unwrap();
        let loaded = ImageProcessor::open(&path).unwrap();
        assert_eq!(loaded.as_dynamic(), &img);
    }

    #[test]
    fn open_missing_file_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageProcessor::open(dir.path().join("missing.png"));
        assert!(matches!(result, Err(FlatscanError::ImageError(_))));
    }
}
