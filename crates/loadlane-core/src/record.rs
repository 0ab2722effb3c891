use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier for one simulated user (one logical concurrent worker).
///
/// Records carrying different user ids are never related to one another,
/// regardless of how their intervals happen to overlap on the wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a user id from its integer form.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the integer form used in the request log.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Kind of request a record describes.
///
/// Timed scopes emit synthetic `Action` records; real HTTP calls funneled
/// through the same sink carry their verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Synthetic timed action (not a network call).
    Action,
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl RequestKind {
    /// Returns the literal written to the `http_method` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Whether this record is a synthetic timed action.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Action)
    }
}

impl FromStr for RequestKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(Self::Action),
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            _ => Err(()),
        }
    }
}

/// One completed timed interval, immutable once created.
///
/// `start` and `end` are seconds since the Unix epoch, taken from a shared
/// [`ClockReference`](crate::ClockReference) so they are comparable across
/// concurrently running users. Names are convention-encoded `Parent:Child`
/// when nested; nothing enforces the convention, the nesting itself is
/// reconstructed from interval containment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Human-readable scope name.
    pub name: String,
    /// Synthetic action or HTTP verb.
    pub kind: RequestKind,
    /// Interval start, seconds since epoch.
    pub start: f64,
    /// Interval end, seconds since epoch.
    pub end: f64,
    /// False when a failure propagated out of the scope.
    pub success: bool,
    /// Owning simulated user.
    pub user_id: UserId,
}

impl ActionRecord {
    /// Interval length in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `other` lies fully inside this interval.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}
