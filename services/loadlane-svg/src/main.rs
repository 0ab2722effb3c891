//! `svg_tool`: render a request log as a swimlane timing diagram.
//!
//! Offline reporting step run after a load test finishes. There is no
//! recovery path on malformed input; errors propagate and end the
//! process.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use loadlane_core::store;
use loadlane_report::{build_forests, render_svg, SvgOptions};

#[derive(Parser, Debug)]
#[command(name = "svg_tool")]
#[command(about = "Render a LoadLane request log as an SVG timing diagram", long_about = None)]
#[command(version)]
struct Cli {
    /// Request-log CSV written during a load run
    input: PathBuf,

    /// Output SVG path
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Cli::parse();

    let records = store::load_csv(&args.input)?;
    info!(rows = records.len(), input = %args.input.display(), "request log loaded");

    // Only synthetic timed actions form the nesting; raw HTTP rows share
    // the log but are not intervals of the diagram.
    let actions: Vec<_> = records
        .into_iter()
        .filter(|r| r.kind.is_action())
        .collect();

    let forests = build_forests(&actions)?;
    info!(
        actions = actions.len(),
        users = forests.len(),
        "interval forests built"
    );

    let svg = render_svg(&forests, &SvgOptions::default());
    std::fs::write(&args.output, svg)?;
    info!(output = %args.output.display(), "diagram written");

    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
