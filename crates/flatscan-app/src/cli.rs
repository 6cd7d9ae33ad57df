// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and the scan command built on them.

use std::path::PathBuf;

use clap::Parser;
use flatscan_core::error::Result;
use flatscan_core::{Contour, Point2D, Quadrilateral, ScanConfig};
use flatscan_document::image::ImageProcessor;
use flatscan_document::scan::pipeline::working_ratio;
use flatscan_document::{DocumentScanner, PerspectiveRectifier};
use tracing::info;

/// Straighten a photographed document into a flat, top-down image.
#[derive(Debug, Parser)]
#[command(name = "flatscan", version, about)]
pub struct Args {
    /// Photo containing the document
    pub image: PathBuf,

    /// The four document corners in photo pixels, as X,Y pairs in any order
    #[arg(
        long,
        num_args = 4,
        value_name = "X,Y",
        value_parser = parse_point,
        required_unless_present = "contours",
        conflicts_with = "contours"
    )]
    pub corners: Vec<Point2D>,

    /// JSON file with candidate outlines (arrays of {"x","y"} points) found
    /// on a copy of the photo resized to the working height
    #[arg(long, value_name = "FILE")]
    pub contours: Option<PathBuf>,

    /// Where to write the straightened image
    #[arg(short, long, default_value = "./scan.png")]
    pub output: PathBuf,

    /// JSON scan settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Convert the result to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Height of the working copy the contours were detected on
    #[arg(long, value_name = "PIXELS")]
    pub working_height: Option<u32>,
}

/// Parse an `X,Y` pair.
pub fn parse_point(value: &str) -> std::result::Result<Point2D, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{value}`"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|err| format!("bad X coordinate `{x}`: {err}"))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|err| format!("bad Y coordinate `{y}`: {err}"))?;
    Ok(Point2D::new(x, y))
}

/// Settings from `--config` (or defaults) with command-line overrides applied.
pub fn effective_config(args: &Args) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if args.grayscale {
        config.output_grayscale = true;
    }
    if let Some(height) = args.working_height {
        config.working_height = height;
    }
    config.validate()?;
    Ok(config)
}

/// Load the photo, rectify the document and save the result.
pub fn run(args: &Args) -> Result<()> {
    let config = effective_config(args)?;
    let photo = ImageProcessor::open(&args.image)?.into_dynamic();

    let rectified = match &args.contours {
        Some(path) => {
            let contours: Vec<Contour> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let ratio = working_ratio(photo.height(), config.working_height);
            info!(contours = contours.len(), ratio, "Scanning with candidate outlines");
            DocumentScanner::new(config)?.scan(&photo, &contours, ratio)?.image
        }
        None => {
            let quad = Quadrilateral::new(args.corners.clone());
            let rectified = PerspectiveRectifier::from_config(&config).rectify(&photo, &quad)?;
            let processor = ImageProcessor::from_dynamic(rectified);
            if config.output_grayscale {
                processor.grayscale().into_dynamic()
            } else {
                processor.into_dynamic()
            }
        }
    };

    ImageProcessor::from_dynamic(rectified).save(&args.output)
}
