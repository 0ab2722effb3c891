//! End-to-end pipeline: drive a synthetic scenario through the runner,
//! persist the request log, reload it, rebuild the forests, and render
//! the diagram.

use std::sync::Arc;

use loadlane_core::{
    check, load_csv, ActionResult, Actor, ClockReference, RunConfig, Runner, Scenario,
};
use loadlane_report::{build_forests, render_svg, SvgOptions};
use tempfile::NamedTempFile;

struct GridWorkflow;

impl Scenario for GridWorkflow {
    fn name(&self) -> &str {
        "GridWorkflow"
    }

    fn iteration(&self, actor: &Actor, iteration: u64) -> ActionResult<()> {
        actor.timed("GridWorkflow:Iteration:Open report", |name| {
            actor.timed(format!("{name}:Fetch rows"), |_| Ok(()))?;
            actor.timed(format!("{name}:Render grid"), |_| Ok(()))
        })?;
        actor.timed("GridWorkflow:Iteration:Sort column", |_| {
            check(iteration != 2, "sort order never settled")
        })?;
        Ok(())
    }
}

#[test]
fn scenario_to_svg_round_trip() {
    let config = RunConfig {
        users: 2,
        iterations_per_user: 2,
        wait_time_min_ms: 0,
        wait_time_max_ms: 0,
        ..RunConfig::default()
    };
    let runner = Runner::new(config, Arc::new(ClockReference::new()));
    let report = runner.run(Arc::new(GridWorkflow));

    // Iteration 2 fails for both users, is absorbed, and the run
    // finishes all iterations anyway.
    assert_eq!(report.failures, 2);
    // Per user per iteration: root, Open report, its two children, and
    // Sort column. The failing Sort column still emits its record.
    assert_eq!(report.records.len(), 2 * 2 * 5);

    let file = NamedTempFile::new().unwrap();
    report.save_csv(file.path()).unwrap();

    let loaded = load_csv(file.path()).unwrap();
    assert_eq!(loaded, report.records);

    let forests = build_forests(&loaded).unwrap();
    assert_eq!(forests.len(), 2);
    for forest in &forests {
        // Two iteration roots per user.
        assert_eq!(forest.roots.len(), 2);
        // Roots appear in start order.
        let root_starts: Vec<f64> = forest.roots.iter().map(|&i| forest.records[i].start).collect();
        assert!(root_starts.windows(2).all(|w| w[0] <= w[1]));
        // Depth: root -> Open report -> Fetch rows.
        assert_eq!(forest.rows(), 3);
    }

    let svg = render_svg(&forests, &SvgOptions::default());
    assert!(svg.contains("GridWorkflow:Iteration"));
    assert!(svg.contains("Sort column"));
    assert!(svg.contains(">user 1<"));
    assert!(svg.contains(">user 2<"));
    // 20 records, one bar each.
    assert_eq!(svg.matches("<title>").count(), 20);
}
