// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the flatscan-document crate: corner ordering,
// four-point homography solving, and full perspective rectification on a
// synthetic photo.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use flatscan_core::{Point2D, Quadrilateral};
use flatscan_document::{PerspectiveRectifier, order, solve_homography};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tilted_page() -> Quadrilateral {
    Quadrilateral::from_points([(412.0, 31.0), (38.0, 52.0), (455.0, 610.0), (21.0, 590.0)])
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_order(c: &mut Criterion) {
    let quad = tilted_page();
    c.bench_function("order (sum/diff)", |b| {
        b.iter(|| order(black_box(&quad)));
    });
}

fn bench_solve_homography(c: &mut Criterion) {
    let src = [(38.0, 52.0), (412.0, 31.0), (455.0, 610.0), (21.0, 590.0)].map(Point2D::from);
    let dst = [(0.0, 0.0), (433.0, 0.0), (433.0, 557.0), (0.0, 557.0)].map(Point2D::from);
    c.bench_function("solve_homography", |b| {
        b.iter(|| solve_homography(black_box(&src), black_box(&dst)));
    });
}

/// Rectify a 480x640 photo with a bright page on a dark background, once
/// in grayscale and once in RGB.
fn bench_rectify(c: &mut Criterion) {
    let (width, height) = (480u32, 640u32);
    let mut gray = GrayImage::from_pixel(width, height, Luma([30u8]));
    for y in 40..600 {
        for x in 30..450 {
            gray.put_pixel(x, y, Luma([240u8]));
        }
    }
    let gray = DynamicImage::ImageLuma8(gray);
    let rgb = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let quad = tilted_page();
    let rectifier = PerspectiveRectifier::new();

    c.bench_function("rectify gray (480x640)", |b| {
        b.iter(|| rectifier.rectify(black_box(&gray), black_box(&quad)));
    });
    c.bench_function("rectify rgb (480x640)", |b| {
        b.iter(|| rectifier.rectify(black_box(&rgb), black_box(&quad)));
    });
    c.bench_function("rectify gray sequential (480x640)", |b| {
        let sequential = PerspectiveRectifier::new().with_parallel_min_pixels(usize::MAX);
        b.iter(|| sequential.rectify(black_box(&gray), black_box(&quad)));
    });
}

criterion_group!(benches, bench_order, bench_solve_homography, bench_rectify);
criterion_main!(benches);
