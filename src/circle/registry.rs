//! Circle Registry: circle creation, snapshots, and archival.
//!
//! The registry owns the set of circles. It allocates identifiers, validates
//! creation input, and delegates the creator's initial `Admin` admission to
//! the store in the same transaction as the circle insert, so a circle can
//! never exist with `member_count < 1`.

use std::sync::Arc;

use log::debug;

use super::error::{LedgerError, Result};
use super::store::LedgerStore;
use super::types::{Address, CircleConfig, CircleId, CircleView, MAX_CAPACITY};

/// Owner of circle metadata and lifecycle.
pub struct CircleRegistry {
    store: Arc<LedgerStore>,
}

impl CircleRegistry {
    pub(crate) const fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Creates a new circle with `caller` as its `Admin`.
    ///
    /// Returns the freshly allocated circle identifier. A rejected call
    /// allocates nothing; the identifier sequence continues as if the call
    /// never happened.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidInput`] if the name or description trims
    /// empty or the capacity is outside `1..=100`.
    pub fn create_circle(&self, caller: &Address, config: &CircleConfig) -> Result<CircleId> {
        let name = config.name.trim();
        let description = config.description.trim();

        if name.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Circle name must not be empty".to_string(),
            ));
        }
        if description.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Circle description must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_CAPACITY).contains(&config.capacity) {
            return Err(LedgerError::InvalidInput(format!(
                "Capacity must be between 1 and {MAX_CAPACITY}, got {}",
                config.capacity
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let circle_id = self.store.insert_circle(
            name,
            description,
            config.is_private,
            config.capacity,
            caller,
            now,
        )?;

        debug!("circle {circle_id} created by {caller}");
        Ok(circle_id)
    }

    /// Returns a snapshot of the circle.
    ///
    /// Pure read; archived circles still return their last valid snapshot
    /// with `is_active = false`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown identifier.
    pub fn circle_info(&self, circle_id: CircleId) -> Result<CircleView> {
        let circle = self
            .store
            .get_circle(circle_id)?
            .ok_or(LedgerError::NotFound(circle_id))?;
        Ok(circle.into())
    }

    /// Archives a circle, irreversibly freezing all of its state.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown identifier,
    /// [`LedgerError::Unauthorized`] if the caller is not the circle's
    /// `Admin`, or [`LedgerError::CircleArchived`] if it is already archived.
    pub fn archive_circle(&self, caller: &Address, circle_id: CircleId) -> Result<()> {
        let circle = self
            .store
            .get_circle(circle_id)?
            .ok_or(LedgerError::NotFound(circle_id))?;

        if circle.creator != *caller {
            return Err(LedgerError::Unauthorized(format!(
                "Only the admin may archive circle {circle_id}"
            )));
        }
        if !circle.is_active {
            return Err(LedgerError::CircleArchived(circle_id));
        }

        self.store.set_archived(circle_id)?;
        debug!("circle {circle_id} archived by {caller}");
        Ok(())
    }
}
