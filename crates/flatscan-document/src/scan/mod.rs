// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — perspective rectification of a document quadrilateral,
// plus candidate selection over ranked contours.

pub mod pipeline;
pub mod rectify;

pub use pipeline::{DocumentScanner, RankedCandidate, ScanOutcome, rank_candidates, working_copy};
pub use rectify::{PerspectiveRectifier, RectificationPlan, destination_size, rectify};
