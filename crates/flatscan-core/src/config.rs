// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};

/// Strategy used to assign corner roles to the four boundary points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Smallest `x + y` is top-left, largest is bottom-right; `y - x` splits
    /// the remaining two. Cheap, but only reliable for small tilts.
    #[default]
    SumDiff,
    /// Clockwise order by polar angle around the centroid.
    CentroidAngle,
}

/// Settings for the rectification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Height of the downsized working copy handed to contour detection.
    pub working_height: u32,
    /// Number of largest candidate contours to consider.
    pub max_candidates: usize,
    /// Normalised intensity (0.0..=1.0) written where the source has no data.
    pub background: f32,
    /// Outputs with at least this many pixels are resampled on the rayon pool.
    pub parallel_min_pixels: usize,
    /// Convert the rectified output to grayscale.
    pub output_grayscale: bool,
    /// Corner classification strategy.
    pub classifier: ClassifierKind,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_height: 500,
            max_candidates: 5,
            background: 0.0,
            parallel_min_pixels: 256 * 256,
            output_grayscale: false,
            classifier: ClassifierKind::SumDiff,
        }
    }
}

impl ScanConfig {
    /// Read a JSON config file. Missing fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), data)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.working_height == 0 {
            return Err(FlatscanError::Config(
                "working_height must be at least 1".into(),
            ));
        }
        if self.max_candidates == 0 {
            return Err(FlatscanError::Config(
                "max_candidates must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.background) {
            return Err(FlatscanError::Config(format!(
                "background must be within 0.0..=1.0, got {}",
                self.background
            )));
        }
        Ok(())
    }
}
