// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flatscan — straighten photographed documents.
//
// Entry point. Initialises logging, parses arguments, and runs a single scan.

mod cli;

use clap::Parser;
use flatscan_core::human_errors::humanize_error;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    tracing::info!(image = %args.image.display(), "Flatscan starting");

    if let Err(err) = cli::run(&args) {
        let human = humanize_error(&err);
        tracing::error!(error = %err, retriable = human.retriable, "Scan failed");
        eprintln!("{}\n{}", human.message, human.suggestion);
        std::process::exit(1);
    }

    tracing::info!(output = %args.output.display(), "Scan saved");
}
