//! Runs a synthetic scenario and writes `requests.csv`, ready for
//! `svg_tool`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use loadlane_core::{
    check, ActionResult, Actor, ClockReference, RunConfig, Runner, Scenario,
};
use tracing_subscriber::{fmt, EnvFilter};

struct BrowseReports;

impl Scenario for BrowseReports {
    fn name(&self) -> &str {
        "BrowseReports"
    }

    fn iteration(&self, actor: &Actor, iteration: u64) -> ActionResult<()> {
        actor.timed("BrowseReports:Iteration:Open report", |name| {
            actor.timed(format!("{name}:Fetch rows"), |_| {
                thread::sleep(Duration::from_millis(40));
                Ok(())
            })?;
            actor.timed(format!("{name}:Render grid"), |_| {
                thread::sleep(Duration::from_millis(25));
                Ok(())
            })
        })?;

        actor.checkpoint()?;

        actor.timed("BrowseReports:Iteration:Sort column", |_| {
            thread::sleep(Duration::from_millis(15));
            // Every third iteration simulates a failed expectation.
            check(iteration % 3 != 0, "sorted rows came back unsorted")
        })?;

        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();

    let config = RunConfig {
        users: 3,
        iterations_per_user: 4,
        wait_time_min_ms: 50,
        wait_time_max_ms: 150,
        ..RunConfig::default()
    };

    let runner = Runner::new(config.clone(), Arc::new(ClockReference::new()));
    let report = runner.run(Arc::new(BrowseReports));

    println!(
        "{} records, {} failed iterations, {:.2}s wall time",
        report.records.len(),
        report.failures,
        report.wall_seconds
    );

    report.save_csv(&config.output_csv)?;
    println!("request log written to {}", config.output_csv);
    Ok(())
}
