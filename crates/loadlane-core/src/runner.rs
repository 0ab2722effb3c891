//! Thread-per-user scenario runner.
//!
//! Each simulated user runs on its own thread, owns an [`Actor`] sharing
//! one clock, one sink, and one cancellation flag, and wraps every
//! scenario iteration in a root scope — so a failing iteration is
//! recorded and absorbed, never fatal to the worker. Cancellation is
//! cooperative: workers check the flag between steps and while sleeping
//! out the think time, and every worker is joined before `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::clock::ClockReference;
use crate::config::RunConfig;
use crate::outcome::ActionResult;
use crate::record::{ActionRecord, UserId};
use crate::scope::Actor;
use crate::sink::RecordSink;
use crate::store::{self, StoreResult};

/// Interval at which sleeping workers re-check the cancellation flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One user workflow, driven once per iteration.
pub trait Scenario: Send + Sync + 'static {
    /// Label used as the root-scope name prefix.
    fn name(&self) -> &str;

    /// Runs one iteration of the workflow.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`](crate::ActionError) describing the
    /// failed step; the runner records and absorbs it.
    fn iteration(&self, actor: &Actor, iteration: u64) -> ActionResult<()>;
}

/// Handle for requesting cooperative shutdown of a running load test.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Asks every worker to stop after its current step.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Summary of one finished run.
#[derive(Debug)]
pub struct RunReport {
    /// Wall-clock time the run started.
    pub started_at: DateTime<Utc>,
    /// Total run duration in seconds.
    pub wall_seconds: f64,
    /// Every record emitted during the run.
    pub records: Vec<ActionRecord>,
    /// Root iterations that failed and were absorbed.
    pub failures: u64,
}

impl RunReport {
    /// Writes the request log to `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the file cannot be written.
    pub fn save_csv<P: AsRef<std::path::Path>>(&self, path: P) -> StoreResult<()> {
        store::save_csv(path, &self.records)
    }
}

/// Spawns and supervises the simulated users for one run.
pub struct Runner {
    config: RunConfig,
    clock: Arc<ClockReference>,
    sink: RecordSink,
    cancel: Arc<AtomicBool>,
}

impl Runner {
    /// Creates a runner over a shared clock reference.
    #[must_use]
    pub fn new(config: RunConfig, clock: Arc<ClockReference>) -> Self {
        Self {
            config,
            clock,
            sink: RecordSink::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting shutdown from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.cancel),
        }
    }

    /// The sink workers append to; useful for live inspection.
    #[must_use]
    pub fn sink(&self) -> RecordSink {
        self.sink.clone()
    }

    /// Runs the scenario to completion (or cancellation) and joins every
    /// worker before returning.
    pub fn run(&self, scenario: Arc<dyn Scenario>) -> RunReport {
        let started_at = Utc::now();
        let run_start = self.clock.now();
        info!(
            scenario = scenario.name(),
            users = self.config.users,
            iterations = self.config.iterations_per_user,
            "starting load run"
        );

        let mut workers = Vec::with_capacity(self.config.users as usize);
        for user in 1..=self.config.users {
            let actor = Actor::with_cancel_flag(
                UserId::new(user),
                Arc::clone(&self.clock),
                self.sink.clone(),
                Arc::clone(&self.cancel),
            );
            let scenario = Arc::clone(&scenario);
            let config = self.config.clone();
            let cancel = Arc::clone(&self.cancel);
            workers.push(
                thread::Builder::new()
                    .name(format!("loadlane-user-{user}"))
                    .spawn(move || run_worker(&actor, scenario.as_ref(), &config, &cancel))
                    .expect("spawning worker thread"),
            );
        }

        let mut failures = 0;
        for worker in workers {
            match worker.join() {
                Ok(worker_failures) => failures += worker_failures,
                Err(_) => {
                    warn!("worker thread panicked outside any scope");
                    failures += 1;
                }
            }
        }

        let wall_seconds = self.clock.now() - run_start;
        let records = self.sink.take();
        info!(
            records = records.len(),
            failures, wall_seconds, "load run finished"
        );
        RunReport {
            started_at,
            wall_seconds,
            records,
            failures,
        }
    }
}

fn run_worker(
    actor: &Actor,
    scenario: &dyn Scenario,
    config: &RunConfig,
    cancel: &AtomicBool,
) -> u64 {
    let root_name = format!("{}:Iteration", scenario.name());
    let mut failures = 0;

    for iteration in 1..=config.iterations_per_user {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        match actor.timed_root(root_name.clone(), |_| scenario.iteration(actor, iteration)) {
            Ok(Some(())) => {}
            Ok(None) => failures += 1,
            // Only Cancelled escapes a root scope.
            Err(_) => break,
        }

        if iteration < config.iterations_per_user {
            think(config, cancel);
        }
    }

    failures
}

/// Sleeps out a jittered think time, waking early on cancellation.
fn think(config: &RunConfig, cancel: &AtomicBool) {
    let wait_ms = if config.wait_time_max_ms > config.wait_time_min_ms {
        rand::thread_rng().gen_range(config.wait_time_min_ms..=config.wait_time_max_ms)
    } else {
        config.wait_time_min_ms
    };
    let mut remaining = Duration::from_millis(wait_ms);
    while !remaining.is_zero() {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        let step = remaining.min(CANCEL_POLL_INTERVAL);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::check;
    use crate::record::RequestKind;

    struct Synthetic;

    impl Scenario for Synthetic {
        fn name(&self) -> &str {
            "Synthetic"
        }

        fn iteration(&self, actor: &Actor, iteration: u64) -> ActionResult<()> {
            actor.timed("Synthetic:Iteration:Step A", |_| Ok(()))?;
            actor.timed("Synthetic:Iteration:Step B", |_| {
                check(iteration != 2, "iteration two always fails")
            })?;
            Ok(())
        }
    }

    fn quick_config(users: u64, iterations: u64) -> RunConfig {
        RunConfig {
            users,
            iterations_per_user: iterations,
            wait_time_min_ms: 0,
            wait_time_max_ms: 0,
            ..RunConfig::default()
        }
    }

    #[test]
    fn clean_run_emits_one_root_per_iteration() {
        let runner = Runner::new(quick_config(3, 1), Arc::new(ClockReference::new()));
        let report = runner.run(Arc::new(Synthetic));

        let roots: Vec<_> = report
            .records
            .iter()
            .filter(|r| r.name == "Synthetic:Iteration")
            .collect();
        assert_eq!(roots.len(), 3);
        assert_eq!(report.failures, 0);
        // Each iteration: two steps plus the root.
        assert_eq!(report.records.len(), 9);
        assert!(report.records.iter().all(|r| r.kind == RequestKind::Action));
    }

    #[test]
    fn failed_iterations_are_absorbed_and_counted() {
        let runner = Runner::new(quick_config(1, 3), Arc::new(ClockReference::new()));
        let report = runner.run(Arc::new(Synthetic));

        assert_eq!(report.failures, 1);
        let roots: Vec<_> = report
            .records
            .iter()
            .filter(|r| r.name == "Synthetic:Iteration")
            .collect();
        // The worker kept going after the failed iteration.
        assert_eq!(roots.len(), 3);
        assert_eq!(roots.iter().filter(|r| !r.success).count(), 1);
    }

    #[test]
    fn user_ids_are_assigned_sequentially() {
        let runner = Runner::new(quick_config(2, 1), Arc::new(ClockReference::new()));
        let report = runner.run(Arc::new(Synthetic));

        let mut users: Vec<u64> = report.records.iter().map(|r| r.user_id.as_u64()).collect();
        users.sort_unstable();
        users.dedup();
        assert_eq!(users, vec![1, 2]);
    }

    #[test]
    fn stop_handle_ends_the_run_early() {
        struct Stopper {
            handle: StopHandle,
        }

        impl Scenario for Stopper {
            fn name(&self) -> &str {
                "Stopper"
            }

            fn iteration(&self, actor: &Actor, _iteration: u64) -> ActionResult<()> {
                self.handle.request_stop();
                actor.checkpoint()
            }
        }

        let runner = Runner::new(quick_config(1, 1000), Arc::new(ClockReference::new()));
        let handle = runner.stop_handle();
        let report = runner.run(Arc::new(Stopper { handle }));

        // The first iteration requested shutdown; nothing ran after it.
        let roots = report
            .records
            .iter()
            .filter(|r| r.name == "Stopper:Iteration")
            .count();
        assert_eq!(roots, 1);
    }
}
