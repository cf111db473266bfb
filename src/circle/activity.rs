//! Activity Log: append-only stream of encrypted content references.
//!
//! Only members may append, and only members may read. For private circles
//! every append must additionally carry an attestation accepted by the
//! verifier; a missing attestation, a rejection, and a verifier error are
//! all treated as rejection (fail-closed).

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};

use super::error::{LedgerError, Result};
#[cfg(test)]
use super::membership::MembershipLedger;
use super::store::LedgerStore;
use super::types::{
    ActivityRecord, Address, Attestation, CircleId, ContentRef, UPDATES_PAGE_SIZE,
};
use crate::verifier::{AttestationVerifier, VerifyContext};

/// Per-circle append-only activity stream.
pub struct ActivityLog {
    store: Arc<LedgerStore>,
    verifier: Arc<dyn AttestationVerifier>,
}

impl ActivityLog {
    pub(crate) fn new(store: Arc<LedgerStore>, verifier: Arc<dyn AttestationVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Appends an update to the circle's activity stream.
    ///
    /// Returns the zero-based index of the new record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown circle,
    /// [`LedgerError::CircleArchived`] if the circle is frozen,
    /// [`LedgerError::NotMember`] if the caller holds no membership,
    /// [`LedgerError::InvalidInput`] for an empty content reference,
    /// [`LedgerError::MessageQuotaExceeded`] once the message counter is
    /// saturated, and [`LedgerError::VerificationFailed`] when a private
    /// circle's attestation is missing, rejected, or errors out.
    pub fn post_update(
        &self,
        caller: &Address,
        circle_id: CircleId,
        content_ref: ContentRef,
        attestation: Option<&Attestation>,
    ) -> Result<u32> {
        let circle = self
            .store
            .get_circle(circle_id)?
            .ok_or(LedgerError::NotFound(circle_id))?;

        if !circle.is_active {
            return Err(LedgerError::CircleArchived(circle_id));
        }
        if self.store.get_membership(circle_id, caller)?.is_none() {
            return Err(LedgerError::NotMember(circle_id));
        }
        if content_ref.is_empty() {
            return Err(LedgerError::InvalidInput(
                "Content reference must not be empty".to_string(),
            ));
        }
        if circle.message_count == u8::MAX {
            return Err(LedgerError::MessageQuotaExceeded(circle_id));
        }

        if circle.is_private {
            self.check_attestation(caller, circle_id, attestation)?;
        }

        // record_index mirrors message_count: both advance together and
        // posts are rejected before the counter can saturate past 255.
        let record = ActivityRecord {
            circle_id,
            record_index: u32::from(circle.message_count),
            author: *caller,
            content_ref,
            posted_at: Utc::now().timestamp(),
        };
        self.store
            .append_record(&record, circle.message_count.saturating_add(1))?;

        debug!(
            "update {} posted to circle {circle_id} by {caller}",
            record.record_index
        );
        Ok(record.record_index)
    }

    /// Verifies the attestation for a private-circle post. Fail-closed: only
    /// an affirmative verifier response lets the post proceed.
    fn check_attestation(
        &self,
        caller: &Address,
        circle_id: CircleId,
        attestation: Option<&Attestation>,
    ) -> Result<()> {
        let Some(attestation) = attestation else {
            return Err(LedgerError::VerificationFailed(format!(
                "Private circle {circle_id} requires an attestation"
            )));
        };

        let context = VerifyContext {
            circle_id,
            author: *caller,
        };
        match self.verifier.verify(attestation, &context) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LedgerError::VerificationFailed(
                "Attestation rejected by verifier".to_string(),
            )),
            Err(e) => {
                warn!("verifier error for circle {circle_id}, treating as rejection: {e}");
                Err(LedgerError::VerificationFailed(e.to_string()))
            }
        }
    }

    /// Returns one page of the circle's activity records.
    ///
    /// Content visibility is an access-control gate: the opaque references
    /// are released only to admitted members. Pages are stable across
    /// repeated calls absent new posts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown circle or
    /// [`LedgerError::NotMember`] if the caller holds no membership.
    pub fn list_updates(
        &self,
        caller: &Address,
        circle_id: CircleId,
        page: u32,
    ) -> Result<Vec<ActivityRecord>> {
        if self.store.get_circle(circle_id)?.is_none() {
            return Err(LedgerError::NotFound(circle_id));
        }
        if self.store.get_membership(circle_id, caller)?.is_none() {
            return Err(LedgerError::NotMember(circle_id));
        }

        let page_size = u32::try_from(UPDATES_PAGE_SIZE)
            .map_err(|e| LedgerError::Storage(format!("Invalid page size: {e}")))?;
        let offset = page.saturating_mul(page_size);
        self.store.records_page(circle_id, offset, page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::registry::CircleRegistry;
    use crate::circle::types::CircleConfig;
    use crate::verifier::{ErroringVerifier, StaticVerifier};

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn content() -> ContentRef {
        ContentRef::new(vec![0xab; 8])
    }

    fn setup(
        is_private: bool,
        verifier: Arc<dyn AttestationVerifier>,
    ) -> (ActivityLog, MembershipLedger, CircleId) {
        let store = Arc::new(LedgerStore::in_memory().unwrap());
        let registry = CircleRegistry::new(Arc::clone(&store));
        let config = CircleConfig::new("Test")
            .with_description("desc")
            .with_privacy(is_private);
        let circle_id = registry.create_circle(&addr(1), &config).unwrap();
        let membership = MembershipLedger::new(Arc::clone(&store));
        (ActivityLog::new(store, verifier), membership, circle_id)
    }

    #[test]
    fn post_to_public_circle_needs_no_attestation() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::reject()));

        let index = log.post_update(&addr(1), circle_id, content(), None).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn post_indexes_increase() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));

        assert_eq!(
            log.post_update(&addr(1), circle_id, content(), None).unwrap(),
            0
        );
        assert_eq!(
            log.post_update(&addr(1), circle_id, content(), None).unwrap(),
            1
        );
    }

    #[test]
    fn post_to_unknown_circle_fails() {
        let (log, _, _) = setup(false, Arc::new(StaticVerifier::accept()));
        let result = log.post_update(&addr(1), 99, content(), None);
        assert!(matches!(result, Err(LedgerError::NotFound(99))));
    }

    #[test]
    fn non_member_cannot_post() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));
        let result = log.post_update(&addr(2), circle_id, content(), None);
        assert!(matches!(result, Err(LedgerError::NotMember(_))));
    }

    #[test]
    fn empty_content_ref_fails() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));
        let result = log.post_update(&addr(1), circle_id, ContentRef::new(vec![]), None);
        assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn private_circle_requires_attestation() {
        let (log, _, circle_id) = setup(true, Arc::new(StaticVerifier::accept()));

        let result = log.post_update(&addr(1), circle_id, content(), None);
        assert!(matches!(result, Err(LedgerError::VerificationFailed(_))));
        assert!(log.list_updates(&addr(1), circle_id, 0).unwrap().is_empty());
    }

    #[test]
    fn private_circle_accepts_valid_attestation() {
        let (log, _, circle_id) = setup(true, Arc::new(StaticVerifier::accept()));

        let attestation = Attestation::new(vec![1, 2, 3]);
        let index = log
            .post_update(&addr(1), circle_id, content(), Some(&attestation))
            .unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn rejecting_verifier_blocks_post() {
        let (log, _, circle_id) = setup(true, Arc::new(StaticVerifier::reject()));

        let attestation = Attestation::new(vec![1, 2, 3]);
        let result = log.post_update(&addr(1), circle_id, content(), Some(&attestation));
        assert!(matches!(result, Err(LedgerError::VerificationFailed(_))));
        assert!(log.list_updates(&addr(1), circle_id, 0).unwrap().is_empty());
    }

    #[test]
    fn erroring_verifier_is_fail_closed() {
        let (log, _, circle_id) = setup(true, Arc::new(ErroringVerifier));

        let attestation = Attestation::new(vec![1, 2, 3]);
        let result = log.post_update(&addr(1), circle_id, content(), Some(&attestation));
        assert!(matches!(result, Err(LedgerError::VerificationFailed(_))));
        assert!(log.list_updates(&addr(1), circle_id, 0).unwrap().is_empty());
    }

    #[test]
    fn public_circle_ignores_verifier_entirely() {
        let (log, _, circle_id) = setup(false, Arc::new(ErroringVerifier));

        let index = log.post_update(&addr(1), circle_id, content(), None).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn list_updates_requires_membership() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));

        log.post_update(&addr(1), circle_id, content(), None).unwrap();
        let result = log.list_updates(&addr(2), circle_id, 0);
        assert!(matches!(result, Err(LedgerError::NotMember(_))));
    }

    #[test]
    fn list_updates_unknown_circle_fails() {
        let (log, _, _) = setup(false, Arc::new(StaticVerifier::accept()));
        let result = log.list_updates(&addr(1), 99, 0);
        assert!(matches!(result, Err(LedgerError::NotFound(99))));
    }

    #[test]
    fn member_sees_records_in_order() {
        let (log, membership, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));
        membership.join_circle(&addr(2), circle_id).unwrap();

        log.post_update(&addr(1), circle_id, ContentRef::new(vec![1]), None)
            .unwrap();
        log.post_update(&addr(2), circle_id, ContentRef::new(vec![2]), None)
            .unwrap();

        let records = log.list_updates(&addr(2), circle_id, 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_index, 0);
        assert_eq!(records[0].author, addr(1));
        assert_eq!(records[1].record_index, 1);
        assert_eq!(records[1].author, addr(2));
    }

    #[test]
    fn pagination_is_bounded_and_restartable() {
        let (log, _, circle_id) = setup(false, Arc::new(StaticVerifier::accept()));

        for i in 0..25_u8 {
            log.post_update(&addr(1), circle_id, ContentRef::new(vec![i]), None)
                .unwrap();
        }

        let first = log.list_updates(&addr(1), circle_id, 0).unwrap();
        assert_eq!(first.len(), UPDATES_PAGE_SIZE);
        assert_eq!(first[0].record_index, 0);

        let second = log.list_updates(&addr(1), circle_id, 1).unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].record_index, 20);

        // Stable across repeated calls absent new posts.
        assert_eq!(log.list_updates(&addr(1), circle_id, 0).unwrap(), first);

        assert!(log.list_updates(&addr(1), circle_id, 2).unwrap().is_empty());
    }
}
