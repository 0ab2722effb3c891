//! Failure taxonomy and the absorb-vs-propagate rule.
//!
//! Failures inside a timed scope fall into three groups: expected kinds
//! (known failure modes of the system under test), unexpected kinds (bugs
//! in the harness itself, kept behind a distinct marker so reports can
//! tell the two apart), and the cooperative-cancellation signal, which is
//! never wrapped and never absorbed. Whether a scope re-raises or absorbs
//! a failure is a pure function of the scope kind and the outcome.

use thiserror::Error;

/// Failure raised out of a timed scope.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A checked expectation about the system under test did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The server answered with an error status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Server-provided or synthesized detail.
        message: String,
    },

    /// An operation did not complete within its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A response could not be decoded.
    #[error("malformed response: {0}")]
    Parse(String),

    /// An input or argument was out of range.
    #[error("invalid value: {0}")]
    Value(String),

    /// Anything not covered by the expected kinds, including worker
    /// panics caught at the scope boundary.
    #[error("unexpected error: {0}")]
    Unexpected(String),

    /// Operator-requested shutdown. Terminates the worker; not a test
    /// failure.
    #[error("worker cancelled")]
    Cancelled,
}

impl ActionError {
    /// Creates an `Assertion` failure.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Creates an `Http` failure.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an `Unexpected` failure from an arbitrary error.
    #[must_use]
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }

    /// Whether this is a known failure mode of the system under test
    /// rather than a harness bug or a shutdown signal.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Assertion(_)
                | Self::Http { .. }
                | Self::Timeout(_)
                | Self::Parse(_)
                | Self::Value(_)
        )
    }

    /// Whether this is the cooperative-cancellation signal.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Convenient result alias for scope bodies.
pub type ActionResult<T> = Result<T, ActionError>;

/// Fails with an `Assertion` error when `cond` is false.
///
/// # Errors
///
/// Returns `ActionError::Assertion` carrying `message`.
pub fn check(cond: bool, message: impl Into<String>) -> ActionResult<()> {
    if cond {
        Ok(())
    } else {
        Err(ActionError::Assertion(message.into()))
    }
}

/// Whether a scope has an enclosing scope to report failures to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Covers one whole unit of work; absorbs failures from descendants
    /// without crashing the owning worker.
    Root,
    /// Failure is re-raised so the enclosing scope records it too.
    Nested,
}

/// Decides whether a scope's failure is re-raised or absorbed.
///
/// Nested scopes re-raise everything. Root scopes absorb recorded
/// failures so the run continues, except `Cancelled`, which always
/// propagates so cooperative shutdown works.
///
/// # Errors
///
/// Returns the original failure whenever it must remain visible to the
/// caller per the rule above.
pub fn resolve<T>(kind: ScopeKind, outcome: ActionResult<T>) -> ActionResult<Option<T>> {
    match (kind, outcome) {
        (_, Ok(value)) => Ok(Some(value)),
        (ScopeKind::Nested, Err(err)) => Err(err),
        (ScopeKind::Root, Err(err)) if err.is_cancelled() => Err(err),
        (ScopeKind::Root, Err(err)) => {
            tracing::warn!(error = %err, expected = err.is_expected(), "root scope absorbed failure");
            Ok(None)
        }
    }
}
