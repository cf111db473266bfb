//! High-level ledger API.
//!
//! This module provides the [`CircleLedger`], which composes the Circle
//! Registry, Membership Ledger, and Activity Log over one shared store and
//! emits an event after every committed mutation.
//!
//! # Commit Semantics
//!
//! Mutating operations take `&mut self`, so the type system serializes them
//! into a single globally-ordered sequence of commits; reads take `&self`
//! and always observe the latest committed state. Each mutation validates
//! fully before writing and writes inside one storage transaction, so it
//! either applies completely and emits its event, or fails with exactly one
//! error kind and no observable state change.

use std::path::Path;
use std::sync::Arc;

use super::activity::ActivityLog;
use super::error::{LedgerError, Result};
use super::events::{EventSink, LedgerEvent, NullSink};
use super::membership::MembershipLedger;
use super::registry::CircleRegistry;
use super::store::LedgerStore;
use super::types::{
    ActivityRecord, Address, Attestation, CircleConfig, CircleId, CircleView, ContentRef,
};
use crate::verifier::AttestationVerifier;

/// The authoritative circle/membership/content ledger.
///
/// Initialized once with its verifier and event sink; neither can be
/// rebound afterwards.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use std::sync::Arc;
/// use cozycircle_core::circle::CircleLedger;
///
/// let mut ledger = CircleLedger::new(Path::new("/data/cozycircle"), verifier)?;
/// let circle_id = ledger.create_circle(&caller, &config)?;
/// ```
pub struct CircleLedger {
    registry: CircleRegistry,
    membership: MembershipLedger,
    activity: ActivityLog,
    events: Arc<dyn EventSink>,
}

impl CircleLedger {
    /// Creates a ledger backed by `circles.db` under `data_dir`, discarding
    /// events.
    ///
    /// Creates the directory and database if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub fn new(data_dir: &Path, verifier: Arc<dyn AttestationVerifier>) -> Result<Self> {
        Self::with_event_sink(data_dir, verifier, Arc::new(NullSink))
    }

    /// Creates a ledger that delivers events to `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub fn with_event_sink(
        data_dir: &Path,
        verifier: Arc<dyn AttestationVerifier>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| LedgerError::Storage(format!("Failed to create data directory: {e}")))?;

        let db_path = data_dir.join("circles.db");
        let store = Arc::new(LedgerStore::new(&db_path)?);
        Ok(Self::from_parts(store, verifier, events))
    }

    /// Creates an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory(
        verifier: Arc<dyn AttestationVerifier>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let store = Arc::new(LedgerStore::in_memory()?);
        Ok(Self::from_parts(store, verifier, events))
    }

    fn from_parts(
        store: Arc<LedgerStore>,
        verifier: Arc<dyn AttestationVerifier>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry: CircleRegistry::new(Arc::clone(&store)),
            membership: MembershipLedger::new(Arc::clone(&store)),
            activity: ActivityLog::new(store, verifier),
            events,
        }
    }

    // ==================== Circle Registry ====================

    /// Creates a new circle with `caller` as its `Admin` and first member.
    ///
    /// Emits `CircleCreated` on success.
    ///
    /// # Errors
    ///
    /// See [`CircleRegistry::create_circle`].
    pub fn create_circle(&mut self, caller: &Address, config: &CircleConfig) -> Result<CircleId> {
        let circle_id = self.registry.create_circle(caller, config)?;
        self.events.emit(LedgerEvent::CircleCreated {
            circle_id,
            creator: *caller,
            name: config.name.trim().to_string(),
        });
        Ok(circle_id)
    }

    /// Returns a snapshot of the circle. Pure read.
    ///
    /// # Errors
    ///
    /// See [`CircleRegistry::circle_info`].
    pub fn get_circle_info(&self, circle_id: CircleId) -> Result<CircleView> {
        self.registry.circle_info(circle_id)
    }

    /// Archives a circle. Irreversible; all subsequent join/leave/post
    /// calls against the circle fail with `CircleArchived`.
    ///
    /// Emits `CircleArchived` on success.
    ///
    /// # Errors
    ///
    /// See [`CircleRegistry::archive_circle`].
    pub fn archive_circle(&mut self, caller: &Address, circle_id: CircleId) -> Result<()> {
        self.registry.archive_circle(caller, circle_id)?;
        self.events.emit(LedgerEvent::CircleArchived { circle_id });
        Ok(())
    }

    // ==================== Membership Ledger ====================

    /// Admits `caller` to the circle.
    ///
    /// Emits `MemberJoined` on success.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::join_circle`].
    pub fn join_circle(&mut self, caller: &Address, circle_id: CircleId) -> Result<()> {
        self.membership.join_circle(caller, circle_id)?;
        self.events.emit(LedgerEvent::MemberJoined {
            circle_id,
            member: *caller,
        });
        Ok(())
    }

    /// Removes `caller` from the circle.
    ///
    /// Emits `MemberLeft` on success.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::leave_circle`].
    pub fn leave_circle(&mut self, caller: &Address, circle_id: CircleId) -> Result<()> {
        self.membership.leave_circle(caller, circle_id)?;
        self.events.emit(LedgerEvent::MemberLeft {
            circle_id,
            member: *caller,
        });
        Ok(())
    }

    /// Returns whether `address` is a member of the circle. Pure read.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::is_member`].
    pub fn is_member(&self, circle_id: CircleId, address: &Address) -> Result<bool> {
        self.membership.is_member(circle_id, address)
    }

    /// Lists the circles `address` belongs to. Pure read.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::user_circles`].
    pub fn get_user_circles(&self, address: &Address) -> Result<Vec<CircleId>> {
        self.membership.user_circles(address)
    }

    // ==================== Activity Log ====================

    /// Posts an update to the circle, returning the new record's index.
    ///
    /// Emits `UpdatePosted` on success.
    ///
    /// # Errors
    ///
    /// See [`ActivityLog::post_update`].
    pub fn post_update(
        &mut self,
        caller: &Address,
        circle_id: CircleId,
        content_ref: ContentRef,
        attestation: Option<&Attestation>,
    ) -> Result<u32> {
        let record_index = self
            .activity
            .post_update(caller, circle_id, content_ref, attestation)?;
        self.events.emit(LedgerEvent::UpdatePosted {
            circle_id,
            author: *caller,
            record_index,
        });
        Ok(record_index)
    }

    /// Returns one page of the circle's activity records. Pure read.
    ///
    /// # Errors
    ///
    /// See [`ActivityLog::list_updates`].
    pub fn list_updates(
        &self,
        caller: &Address,
        circle_id: CircleId,
        page: u32,
    ) -> Result<Vec<ActivityRecord>> {
        self.activity.list_updates(caller, circle_id, page)
    }
}
