// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Flatscan.

use thiserror::Error;

/// Top-level error type for all Flatscan operations.
#[derive(Debug, Error)]
pub enum FlatscanError {
    // -- Geometry errors --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("degenerate geometry: estimated size {width:.2}x{height:.2} has no area")]
    DegenerateGeometry { width: f64, height: f64 },

    #[error("singular transform: {0}")]
    SingularTransform(String),

    // -- Image errors --
    #[error("unsupported image layout: {0}")]
    UnsupportedImage(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Pipeline --
    #[error("no document found among {candidates} candidate contours")]
    NoDocumentFound { candidates: usize },

    #[error("rectification cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlatscanError {
    /// Whether the error describes a bad candidate quadrilateral rather than a
    /// failure of the surrounding system. Callers holding several ranked
    /// candidates may move on to the next one when this returns `true`.
    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::DegenerateGeometry { .. } | Self::SingularTransform(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FlatscanError>;
