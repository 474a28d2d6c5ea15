//! Dyad
//!
//! Evaluates the temporal regularizers on a pair of consecutive Gaussian-splat
//! frames and prints a JSON report on stdout.
//!
//! Logging goes to stderr; set `RUST_LOG=debug` for per-term statistics.

mod app;
mod errors;

use clap::Parser;
use dyad_train::RotationGather;
use std::path::PathBuf;
use tracing::error;

/// Dyad - temporal consistency losses for dynamic point scenes
#[derive(Parser, Debug)]
#[command(name = "dyad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PLY file of the current frame
    #[arg(long)]
    curr: PathBuf,

    /// PLY file of the previous frame
    #[arg(long)]
    prev: PathBuf,

    /// JSON neighbor edge list ({"indices_i": [..], "indices_j": [..]})
    #[arg(short, long)]
    edges: Option<PathBuf>,

    /// JSON loss configuration; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Share rotation increments between edges with the same source point
    #[arg(long)]
    optimized: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let gather = if args.optimized {
        RotationGather::Deduplicated
    } else {
        RotationGather::PerEdge
    };
    let options = app::RunOptions {
        curr: args.curr,
        prev: args.prev,
        edges: args.edges,
        config: args.config,
        gather,
    };

    match app::run(&options).and_then(|report| Ok(serde_json::to_string_pretty(&report)?)) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Application error: {}", e);
            std::process::exit(1);
        }
    }
}
