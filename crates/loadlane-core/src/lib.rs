//! Core types for LoadLane load-test telemetry: timed scopes, the flat
//! record model, the shared sink, request-log persistence, and the
//! thread-per-user runner.

pub mod clock;
pub mod config;
pub mod outcome;
pub mod record;
pub mod runner;
pub mod scope;
pub mod sink;
pub mod store;

pub use clock::ClockReference;
pub use config::RunConfig;
pub use outcome::{check, resolve, ActionError, ActionResult, ScopeKind};
pub use record::{ActionRecord, RequestKind, UserId};
pub use runner::{RunReport, Runner, Scenario, StopHandle};
pub use scope::Actor;
pub use sink::RecordSink;
pub use store::{load_csv, read_records, save_csv, write_records, StoreError, StoreResult};
