//! Timed scopes.
//!
//! An [`Actor`] is the per-worker handle scopes run against. Every scope,
//! success or failure, emits exactly one record; whether the failure then
//! surfaces to the caller follows the absorb-vs-propagate rule in
//! [`crate::outcome`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::ClockReference;
use crate::outcome::{resolve, ActionError, ActionResult, ScopeKind};
use crate::record::{ActionRecord, RequestKind, UserId};
use crate::sink::RecordSink;

/// Per-worker handle: identity, clock, record sink, and the shared
/// cancellation flag.
#[derive(Debug, Clone)]
pub struct Actor {
    id: UserId,
    clock: Arc<ClockReference>,
    sink: RecordSink,
    cancel: Arc<AtomicBool>,
}

impl Actor {
    /// Creates an actor with its own (never set) cancellation flag.
    #[must_use]
    pub fn new(id: UserId, clock: Arc<ClockReference>, sink: RecordSink) -> Self {
        Self::with_cancel_flag(id, clock, sink, Arc::new(AtomicBool::new(false)))
    }

    /// Creates an actor observing a shared cancellation flag.
    #[must_use]
    pub fn with_cancel_flag(
        id: UserId,
        clock: Arc<ClockReference>,
        sink: RecordSink,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            clock,
            sink,
            cancel,
        }
    }

    /// This actor's user id.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Bails out with [`ActionError::Cancelled`] when shutdown has been
    /// requested. Call between steps of a long scenario.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when the shared flag is set.
    pub fn checkpoint(&self) -> ActionResult<()> {
        if self.cancelled() {
            Err(ActionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `f` inside a nested timed scope.
    ///
    /// The closure receives the scope name so child scopes can compose
    /// theirs (`format!("{name}:Sub-step")`). One record is emitted on
    /// every path; any failure is re-raised so the enclosing scope
    /// records it too.
    ///
    /// # Errors
    ///
    /// Returns whatever failure the scope body produced, with panics
    /// folded into [`ActionError::Unexpected`].
    pub fn timed<T>(
        &self,
        name: impl Into<String>,
        f: impl FnOnce(&str) -> ActionResult<T>,
    ) -> ActionResult<T> {
        // resolve(Nested, _) is the identity on failures; spelled plainly.
        self.execute(&name.into(), f)
    }

    /// Runs `f` inside a root timed scope covering one whole unit of
    /// work.
    ///
    /// Failures are recorded at this level and then absorbed — the
    /// worker keeps running and `Ok(None)` is returned. `Cancelled` is
    /// the single exception and always propagates.
    ///
    /// # Errors
    ///
    /// Returns `Err` only for [`ActionError::Cancelled`].
    pub fn timed_root<T>(
        &self,
        name: impl Into<String>,
        f: impl FnOnce(&str) -> ActionResult<T>,
    ) -> ActionResult<Option<T>> {
        let outcome = self.execute(&name.into(), f);
        resolve(ScopeKind::Root, outcome)
    }

    /// Funnels a real network call into the same record sink.
    pub fn record_request(
        &self,
        kind: RequestKind,
        name: impl Into<String>,
        start: f64,
        end: f64,
        success: bool,
    ) {
        self.sink.push(ActionRecord {
            name: name.into(),
            kind,
            start,
            end,
            success,
            user_id: self.id,
        });
    }

    /// Current time from the shared reference.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    fn execute<T>(&self, name: &str, f: impl FnOnce(&str) -> ActionResult<T>) -> ActionResult<T> {
        let start = self.clock.now();
        let caught = catch_unwind(AssertUnwindSafe(|| f(name)));
        let end = self.clock.now();

        let outcome = match caught {
            Ok(result) => result,
            Err(panic) => Err(panic_error(&panic)),
        };

        self.sink.push(ActionRecord {
            name: name.to_string(),
            kind: RequestKind::Action,
            start,
            end,
            success: outcome.is_ok(),
            user_id: self.id,
        });

        outcome
    }
}

fn panic_error(panic: &(dyn std::any::Any + Send)) -> ActionError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string());
    ActionError::Unexpected(format!("panic: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::check;

    fn actor(sink: &RecordSink) -> Actor {
        Actor::new(UserId::new(1), Arc::new(ClockReference::new()), sink.clone())
    }

    #[test]
    fn success_emits_one_successful_record() {
        let sink = RecordSink::new();
        let got = actor(&sink).timed("Login", |_| Ok(42)).unwrap();
        assert_eq!(got, 42);

        let records = sink.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Login");
        assert!(records[0].success);
        assert!(records[0].start <= records[0].end);
    }

    #[test]
    fn nested_failure_is_recorded_and_reraised() {
        let sink = RecordSink::new();
        let out: ActionResult<()> =
            actor(&sink).timed("Open report", |_| check(false, "rows missing"));
        assert!(matches!(out, Err(ActionError::Assertion(_))));

        let records = sink.snapshot();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
    }

    #[test]
    fn root_scope_absorbs_failure_after_recording_it() {
        let sink = RecordSink::new();
        let out = actor(&sink).timed_root("Iteration", |_| check(false, "rows missing"));
        assert!(matches!(out, Ok(None)));
        assert!(!sink.snapshot()[0].success);
    }

    #[test]
    fn child_failure_marks_every_enclosing_level() {
        let sink = RecordSink::new();
        let actor = actor(&sink);

        let out = actor.timed_root("Iteration", |name| {
            actor.timed(format!("{name}:Step A"), |_| Ok(()))?;
            actor.timed(format!("{name}:Step B"), |_| {
                check(false, "grid never loaded")
            })
        });
        assert!(matches!(out, Ok(None)));

        let records = sink.snapshot();
        assert_eq!(records.len(), 3);
        // Children are emitted at scope exit, so the root comes last.
        let by_name = |n: &str| records.iter().find(|r| r.name.contains(n)).unwrap();
        assert!(by_name("Step A").success);
        assert!(!by_name("Step B").success);
        assert_eq!(records.last().unwrap().name, "Iteration");
        assert!(!records.last().unwrap().success);
    }

    #[test]
    fn cancellation_escapes_the_root() {
        let sink = RecordSink::new();
        let out: ActionResult<Option<()>> =
            actor(&sink).timed_root("Iteration", |_| Err(ActionError::Cancelled));
        assert!(matches!(out, Err(ActionError::Cancelled)));
        // The interval is still recorded.
        assert_eq!(sink.len(), 1);
        assert!(!sink.snapshot()[0].success);
    }

    #[test]
    fn panics_become_unexpected_failures() {
        let sink = RecordSink::new();
        let out = actor(&sink).timed_root("Iteration", |_| -> ActionResult<()> {
            panic!("index out of range")
        });
        assert!(matches!(out, Ok(None)));
        assert!(!sink.snapshot()[0].success);
    }

    #[test]
    fn checkpoint_observes_the_shared_flag() {
        let sink = RecordSink::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let actor = Actor::with_cancel_flag(
            UserId::new(3),
            Arc::new(ClockReference::new()),
            sink,
            cancel.clone(),
        );
        assert!(actor.checkpoint().is_ok());
        cancel.store(true, Ordering::Relaxed);
        assert!(matches!(actor.checkpoint(), Err(ActionError::Cancelled)));
    }

    #[test]
    fn closure_receives_the_scope_name() {
        let sink = RecordSink::new();
        actor(&sink)
            .timed("Outer", |name| {
                assert_eq!(name, "Outer");
                Ok(())
            })
            .unwrap();
    }
}
