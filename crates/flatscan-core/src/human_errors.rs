// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people scanning documents.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the binary reports the failure.

use crate::error::FlatscanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Another candidate or another photo is likely to work.
    Retake,
    /// The user must change something (input file, settings).
    ActionRequired,
    /// Retrying will not help, for example an unsupported format.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether running again with different input can help.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `FlatscanError` into a `HumanError`.
pub fn humanize_error(err: &FlatscanError) -> HumanError {
    match err {
        // -- Geometry --
        FlatscanError::InvalidInput(detail) => HumanError {
            message: "The page outline doesn't look like a page.".into(),
            suggestion: format!("Provide exactly four corners that go around the page. ({detail})"),
            retriable: true,
            severity: Severity::Retake,
        },

        FlatscanError::DegenerateGeometry { .. } => HumanError {
            message: "The page outline is too small to straighten.".into(),
            suggestion: "Check that the four corners are not on top of each other.".into(),
            retriable: true,
            severity: Severity::Retake,
        },

        FlatscanError::SingularTransform(_) => HumanError {
            message: "The page corners are in a straight line.".into(),
            suggestion: "Take the photo again so the whole page is visible, with all four corners showing.".into(),
            retriable: true,
            severity: Severity::Retake,
        },

        FlatscanError::NoDocumentFound { candidates } => HumanError {
            message: "We couldn't find the page in this photo.".into(),
            suggestion: format!(
                "Put the page on a dark, plain surface and take the photo from straight above. ({candidates} outlines checked)"
            ),
            retriable: true,
            severity: Severity::Retake,
        },

        // -- Images --
        FlatscanError::UnsupportedImage(detail) => HumanError {
            message: "This kind of image isn't supported.".into(),
            suggestion: format!("Save the photo as a normal JPEG or PNG and try again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        FlatscanError::ImageError(detail) => HumanError {
            message: "We couldn't read or write the image.".into(),
            suggestion: format!("Check that the file is a picture and isn't damaged. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Pipeline --
        FlatscanError::Cancelled => HumanError {
            message: "Straightening was stopped.".into(),
            suggestion: "Run it again when you're ready.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Config(detail) => HumanError {
            message: "A setting has an invalid value.".into(),
            suggestion: format!("Fix the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Io(io_err) => HumanError {
            message: "A file couldn't be opened or saved.".into(),
            suggestion: format!("Check the file path and that there is enough free space. ({io_err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        FlatscanError::Serialization(json_err) => HumanError {
            message: "A settings or outline file is not valid JSON.".into(),
            suggestion: format!("Check the file for typos. ({json_err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
