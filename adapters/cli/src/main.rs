#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Verdure session.

mod config;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use verdure_world::{query, World};

use crate::{config::SessionConfig, session::Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Verdure session runner", long_about = None)]
struct Args {
    /// Path to a TOML session configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulation steps to run
    #[arg(long, default_value_t = 600)]
    steps: u64,

    /// Seed for terrain generation and the caretaker's path
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Override the number of grid columns
    #[arg(long)]
    columns: Option<u32>,

    /// Override the number of grid rows
    #[arg(long)]
    rows: Option<u32>,

    /// Texture manifest to render with; cells fall back to flat colours without one
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Write the last visible frame as a PNG once the session stops
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Entry point for the Verdure command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(columns) = args.columns {
        config.grid.columns = columns;
    }
    if let Some(rows) = args.rows {
        config.grid.rows = rows;
    }
    if args.manifest.is_some() {
        config.render.manifest = args.manifest;
    }

    println!("{}", query::welcome_banner(&World::new()));

    let mut session = Session::new(config, args.seed)?;
    let summary = session.run(args.steps);
    let outcome = match summary.outcome {
        Some(outcome) => format!("{outcome:?}"),
        None => String::from("undecided"),
    };
    println!("steps: {}", summary.steps);
    println!("active cells: {}", summary.active_cells);
    println!("mean deterioration: {:.3}", summary.mean_deterioration);
    println!("pickups collected: {}", summary.pickups_collected);
    println!("renewals: {}", summary.renewals);
    println!(
        "cells drawn: {} textured, {} flat",
        summary.textured_cells, summary.fallback_cells
    );
    println!("outcome: {outcome}");

    if let Some(path) = &args.snapshot {
        session
            .snapshot()
            .save(path)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        println!("snapshot: {}", path.display());
    }
    Ok(())
}
