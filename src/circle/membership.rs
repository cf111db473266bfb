//! Membership Ledger: the single source of truth for who belongs where.
//!
//! All other components query membership through this type rather than
//! duplicating membership state. It enforces capacity and admission rules
//! and is the sole writer of membership rows.

use std::sync::Arc;

use chrono::Utc;
use log::debug;

use super::error::{LedgerError, Result};
use super::store::LedgerStore;
use super::types::{Address, CircleId, Membership, Role};

/// Per-circle set of admitted addresses.
pub struct MembershipLedger {
    store: Arc<LedgerStore>,
}

impl MembershipLedger {
    pub(crate) const fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Admits `caller` to the circle as a `Member`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown circle,
    /// [`LedgerError::CircleArchived`] if the circle no longer accepts
    /// mutation, [`LedgerError::AlreadyMember`] if the caller already holds
    /// a membership, or [`LedgerError::CircleFull`] at capacity.
    pub fn join_circle(&self, caller: &Address, circle_id: CircleId) -> Result<()> {
        let circle = self
            .store
            .get_circle(circle_id)?
            .ok_or(LedgerError::NotFound(circle_id))?;

        if !circle.is_active {
            return Err(LedgerError::CircleArchived(circle_id));
        }
        if self.store.get_membership(circle_id, caller)?.is_some() {
            return Err(LedgerError::AlreadyMember(circle_id));
        }
        if circle.member_count >= circle.capacity {
            return Err(LedgerError::CircleFull(circle_id));
        }

        let membership = Membership {
            circle_id,
            address: *caller,
            role: Role::Member,
            joined_at: Utc::now().timestamp(),
        };
        self.store
            .add_member(&membership, circle.member_count.saturating_add(1))?;

        debug!("{caller} joined circle {circle_id}");
        Ok(())
    }

    /// Removes `caller`'s membership from the circle.
    ///
    /// The `Admin` cannot leave; admin transfer is out of scope, so an
    /// admin leave would orphan the circle.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown circle,
    /// [`LedgerError::CircleArchived`] if the circle is frozen,
    /// [`LedgerError::NotMember`] if the caller holds no membership, or
    /// [`LedgerError::Unauthorized`] if the caller is the `Admin`.
    pub fn leave_circle(&self, caller: &Address, circle_id: CircleId) -> Result<()> {
        let circle = self
            .store
            .get_circle(circle_id)?
            .ok_or(LedgerError::NotFound(circle_id))?;

        if !circle.is_active {
            return Err(LedgerError::CircleArchived(circle_id));
        }

        let membership = self
            .store
            .get_membership(circle_id, caller)?
            .ok_or(LedgerError::NotMember(circle_id))?;

        if membership.role == Role::Admin {
            return Err(LedgerError::Unauthorized(format!(
                "The admin cannot leave circle {circle_id}"
            )));
        }

        // The admin always remains, so the count never drops below 1.
        let new_count = circle.member_count.saturating_sub(1).max(1);
        self.store
            .remove_member(circle_id, caller, new_count, Utc::now().timestamp())?;

        debug!("{caller} left circle {circle_id}");
        Ok(())
    }

    /// Returns whether `address` holds a membership in the circle.
    ///
    /// Pure read; an unknown circle simply has no members.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn is_member(&self, circle_id: CircleId, address: &Address) -> Result<bool> {
        Ok(self.store.get_membership(circle_id, address)?.is_some())
    }

    /// Lists the circles `address` belongs to, ascending by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_circles(&self, address: &Address) -> Result<Vec<CircleId>> {
        self.store.user_circles(address)
    }
}
