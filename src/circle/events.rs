//! Event emission for off-core indexers.
//!
//! Every committed mutation emits exactly one event. The UI's activity feed
//! is expected to be driven by this stream rather than by polling full
//! state. Events serialize as tagged JSON for indexer consumption.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::types::{Address, CircleId};

/// Notification emitted after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A circle was created.
    CircleCreated {
        /// Identifier of the new circle.
        circle_id: CircleId,
        /// Creator and first `Admin`.
        creator: Address,
        /// Circle name (trimmed).
        name: String,
    },
    /// An address joined a circle.
    MemberJoined {
        /// Circle joined.
        circle_id: CircleId,
        /// New member.
        member: Address,
    },
    /// An address left a circle.
    MemberLeft {
        /// Circle left.
        circle_id: CircleId,
        /// Departed member.
        member: Address,
    },
    /// An update was posted to a circle.
    UpdatePosted {
        /// Circle posted to.
        circle_id: CircleId,
        /// Posting member.
        author: Address,
        /// Index of the appended record.
        record_index: u32,
    },
    /// A circle was archived.
    CircleArchived {
        /// Archived circle.
        circle_id: CircleId,
    },
}

/// Append-only sink for ledger events.
///
/// Implementations must not fail: the mutation has already committed by the
/// time the event is delivered.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: LedgerEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LedgerEvent) {}
}

/// In-memory sink that records events in emission order.
///
/// Useful for indexer tests and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryEventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns all recorded events.
    #[must_use]
    pub fn take(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: LedgerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
