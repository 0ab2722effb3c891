//! Shared record sink.
//!
//! The one piece of state shared across worker threads: an append-only
//! list of completed records, flushed to CSV once the run ends. Appends
//! are order-insensitive; the forest builder re-sorts per user.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::record::ActionRecord;

/// Cheaply clonable handle to the shared record list.
#[derive(Debug, Clone, Default)]
pub struct RecordSink {
    records: Arc<Mutex<Vec<ActionRecord>>>,
}

impl RecordSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one completed record.
    pub fn push(&self, record: ActionRecord) {
        self.records.lock().push(record);
    }

    /// Number of records accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Clones the accumulated records without draining them.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActionRecord> {
        self.records.lock().clone()
    }

    /// Drains and returns the accumulated records.
    #[must_use]
    pub fn take(&self) -> Vec<ActionRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RequestKind, UserId};

    fn record(name: &str) -> ActionRecord {
        ActionRecord {
            name: name.to_string(),
            kind: RequestKind::Action,
            start: 0.0,
            end: 1.0,
            success: true,
            user_id: UserId::new(1),
        }
    }

    #[test]
    fn clones_share_the_same_list() {
        let sink = RecordSink::new();
        let other = sink.clone();
        sink.push(record("a"));
        other.push(record("b"));
        assert_eq!(sink.len(), 2);
        assert_eq!(other.snapshot().len(), 2);
    }

    #[test]
    fn take_drains() {
        let sink = RecordSink::new();
        sink.push(record("a"));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn appends_from_threads_all_land() {
        let sink = RecordSink::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        sink.push(record("t"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 100);
    }
}
